use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_format(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn not_implemented(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::NotImplemented {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn shape_mismatch(buffer: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::ShapeMismatch {
                buffer: buffer.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn duplicate_container(node: impl Into<String>) -> Error {
        Error(ErrorKind::DuplicateContainer { node: node.into() }.into())
    }

    pub fn missing_buffer(key: impl Into<String>) -> Error {
        Error(ErrorKind::MissingBuffer { key: key.into() }.into())
    }

    pub fn type_unresolvable(context: impl Into<String>) -> Error {
        Error(
            ErrorKind::TypeUnresolvable {
                context: context.into(),
            }
            .into(),
        )
    }

    pub fn cyclic_input(context: impl Into<String>) -> Error {
        Error(
            ErrorKind::CyclicInput {
                context: context.into(),
            }
            .into(),
        )
    }

    pub fn missing_field(field: impl Into<String>, context: impl Into<String>) -> Error {
        Error(
            ErrorKind::MissingField {
                field: field.into(),
                context: context.into(),
            }
            .into(),
        )
    }

    pub fn length_mismatch(expected: usize, actual: usize, context: impl Into<String>) -> Error {
        Error(
            ErrorKind::LengthMismatch {
                expected,
                actual,
                context: context.into(),
            }
            .into(),
        )
    }

    pub fn no_compatible_possibility(context: impl Into<String>) -> Error {
        Error(
            ErrorKind::NoCompatiblePossibility {
                context: context.into(),
            }
            .into(),
        )
    }

    pub fn index_out_of_range(index: i64, len: usize) -> Error {
        Error(ErrorKind::IndexOutOfRange { index, len }.into())
    }

    pub fn immutable_value(operation: impl Into<String>) -> Error {
        Error(
            ErrorKind::ImmutableValue {
                operation: operation.into(),
            }
            .into(),
        )
    }

    pub fn external<E>(context: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error(
            ErrorKind::External {
                context: context.into(),
                source: Box::new(source),
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("not yet implemented: {message}")]
    NotImplemented { message: String },

    #[error("invalid format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("shape mismatch for buffer '{buffer}': {message}")]
    ShapeMismatch { buffer: String, message: String },

    #[error("container '{node}' appears more than once under the same root")]
    DuplicateContainer { node: String },

    #[error("buffer '{key}' not found in source")]
    MissingBuffer { key: String },

    #[error("cannot resolve a concrete type: {context}")]
    TypeUnresolvable { context: String },

    #[error("cyclic input: {context}")]
    CyclicInput { context: String },

    #[error("missing field '{field}' in {context}")]
    MissingField { field: String, context: String },

    #[error("length mismatch in {context}: expected {expected}, got {actual}")]
    LengthMismatch {
        expected: usize,
        actual: usize,
        context: String,
    },

    #[error("no compatible union possibility for {context}")]
    NoCompatiblePossibility { context: String },

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("value is immutable: {operation} is not supported")]
    ImmutableValue { operation: String },

    #[error("external error: {context}")]
    External {
        context: String,
        source: StdErrorBoxed,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::external("json", e)
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(_: std::convert::Infallible) -> Self {
        Error::invalid_operation("conversion")
    }
}
