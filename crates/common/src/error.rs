//! Message-based error construction shared by the skilldeck crates.

/// Error types that can be built from a plain message string.
///
/// Implement this for a crate's error type, then invoke [`impl_context!`]
/// in its error module to get `.context()` and `.with_context()` on `Result`
/// and `Option`.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Generate a crate-local `Context` trait with `.context()` and `.with_context()`
/// methods on `Result` and `Option`.
///
/// Invoke inside a module that defines `Error: FromMessage` and
/// `type Result<T> = std::result::Result<T, Error>`.
///
/// ```ignore
/// // in crates/foo/src/error.rs
/// skilldeck_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn context(self, context: impl Into<String>) -> Result<T>;
            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                let ctx = context.into();
                self.map_err(|source| {
                    <Error as $crate::FromMessage>::from_message(format!("{ctx}: {source}"))
                })
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|source| {
                    let ctx = f().into();
                    <Error as $crate::FromMessage>::from_message(format!("{ctx}: {source}"))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(context.into()))
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    mod local {
        use crate::FromMessage;

        #[derive(Debug, thiserror::Error)]
        pub enum Error {
            #[error("{0}")]
            Message(String),
        }

        impl FromMessage for Error {
            fn from_message(message: String) -> Self {
                Self::Message(message)
            }
        }

        pub type Result<T> = std::result::Result<T, Error>;

        crate::impl_context!();
    }

    use local::{Context, Error};

    #[test]
    fn context_prefixes_result_errors() {
        let res: Result<(), &str> = Err("boom");
        let err = res.context("reading lock file").unwrap_err();
        assert_eq!(err.to_string(), "reading lock file: boom");
    }

    #[test]
    fn with_context_is_lazy_on_ok() {
        let res: Result<u8, &str> = Ok(7);
        let value = res
            .with_context(|| -> String { panic!("context built for Ok") })
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn context_turns_none_into_message() {
        let err = None::<u8>.with_context(|| "missing value").unwrap_err();
        assert!(matches!(err, Error::Message(ref m) if m == "missing value"));
    }
}
