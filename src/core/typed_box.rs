//! Type-erased container for task results
//!
//! A [`TypedBox`] carries one value of any `Send + 'static` type from the
//! worker that produced it to the caller holding the task's future. The
//! caller recovers the concrete value with [`TypedBox::cast`].
//!
//! # Example
//!
//! ```rust
//! use rust_task_pool::TypedBox;
//!
//! let value = TypedBox::new(5050u64);
//! assert!(value.is::<u64>());
//! assert_eq!(value.cast::<u64>(), 5050);
//! ```

use std::any::{self, Any};
use std::fmt;

const EMPTY_TYPE_NAME: &str = "<empty>";

/// A move-only box holding a value of any type, or nothing.
///
/// The box is deliberately not `Clone`: handing it from a worker to a
/// caller moves the payload instead of duplicating it.
pub struct TypedBox {
    value: Option<Box<dyn Any + Send>>,
    type_name: &'static str,
}

impl TypedBox {
    /// Wrap a value.
    pub fn new<T: Send + 'static>(value: T) -> Self {
        Self {
            value: Some(Box::new(value)),
            type_name: any::type_name::<T>(),
        }
    }

    /// The empty marker returned for rejected or abandoned tasks.
    pub fn empty() -> Self {
        Self {
            value: None,
            type_name: EMPTY_TYPE_NAME,
        }
    }

    /// Returns true if the box holds no value.
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// Returns true if the box holds a value of type `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.value.as_ref().is_some_and(|v| v.is::<T>())
    }

    /// Name of the stored type, or `"<empty>"`.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Take the value out as `T`.
    ///
    /// # Panics
    ///
    /// Panics if the box is empty or holds a value of another type. Asking
    /// for the wrong type is a bug in the caller, not a runtime condition.
    #[track_caller]
    pub fn cast<T: 'static>(self) -> T {
        let stored = self.type_name;
        match self.try_cast::<T>() {
            Ok(value) => value,
            Err(_) => panic!(
                "TypedBox type mismatch: stored {}, requested {}",
                stored,
                any::type_name::<T>()
            ),
        }
    }

    /// Take the value out as `T`, handing the box back on mismatch.
    pub fn try_cast<T: 'static>(self) -> std::result::Result<T, Self> {
        let type_name = self.type_name;
        match self.value {
            Some(value) => match value.downcast::<T>() {
                Ok(v) => Ok(*v),
                Err(value) => Err(Self {
                    value: Some(value),
                    type_name,
                }),
            },
            None => Err(Self::empty()),
        }
    }
}

impl Default for TypedBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for TypedBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedBox({})", self.type_name)
    }
}
