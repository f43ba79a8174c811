use crate::{error::CheckError, warning::CheckWarning};

use core::cell::RefCell;

/// A handler with which you can emit diagnostics.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Handler {
    /// The inner handler.
    /// This construction is used to avoid `&mut` all over the checker.
    inner: RefCell<HandlerInner>,
}

/// Contains the actual data for `Handler`.
/// Modelled this way to afford an API using interior mutability.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
struct HandlerInner {
    /// The sink through which errors will be emitted.
    errors: Vec<CheckError>,
    /// The sink through which warnings will be emitted.
    warnings: Vec<CheckWarning>,
}

impl Handler {
    pub fn from_parts(errors: Vec<CheckError>, warnings: Vec<CheckWarning>) -> Self {
        Self {
            inner: RefCell::new(HandlerInner { errors, warnings }),
        }
    }

    /// Emit the error `err`.
    pub fn emit_err(&self, err: CheckError) -> ErrorEmitted {
        self.inner.borrow_mut().errors.push(err);
        ErrorEmitted { _priv: () }
    }

    /// Emit the warning `warn`.
    pub fn emit_warn(&self, warn: CheckWarning) {
        self.inner.borrow_mut().warnings.push(warn);
    }

    pub fn has_errors(&self) -> bool {
        !self.inner.borrow().errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.inner.borrow().warnings.is_empty()
    }

    pub fn find_error(&self, f: impl FnMut(&&CheckError) -> bool) -> Option<CheckError> {
        self.inner.borrow().errors.iter().find(f).cloned()
    }

    /// Extract all the errors and warnings from this handler.
    pub fn consume(self) -> (Vec<CheckError>, Vec<CheckWarning>) {
        let inner = self.inner.into_inner();
        (inner.errors, inner.warnings)
    }

    /// Take all diagnostics from `other` and emit them through `self`.
    pub fn append(&self, other: Handler) {
        let (errors, warnings) = other.consume();
        for err in errors {
            self.emit_err(err);
        }
        for warn in warnings {
            self.emit_warn(warn);
        }
    }

    /// Runs `f` with a fresh handler, then merges the collected diagnostics
    /// into `self`. The result is `Err` if the scoped run emitted any error,
    /// even when `f` itself returned `Ok`.
    pub fn scope<T>(
        &self,
        f: impl FnOnce(&Handler) -> Result<T, ErrorEmitted>,
    ) -> Result<T, ErrorEmitted> {
        let scoped = Handler::default();
        let closure_res = f(&scoped);
        let had_errors = scoped.has_errors();
        self.append(scoped);
        if had_errors {
            Err(ErrorEmitted { _priv: () })
        } else {
            closure_res
        }
    }

    /// Produces an [ErrorEmitted] without emitting anything, for callers that
    /// must bail after an error already reported through another handler.
    pub fn cancel(&self) -> ErrorEmitted {
        ErrorEmitted { _priv: () }
    }
}

/// Proof that an error was emitted through a [Handler], and thus that the
/// failure has already been reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ErrorEmitted {
    _priv: (),
}
