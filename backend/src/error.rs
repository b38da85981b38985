use thiserror::Error;

/// Errors raised while loading a file into the grid or saving the grid to the database.
/// Messages are shown to the user as they are.
#[derive(Error, Debug)]
pub enum ImportError {
    // Input errors: reported to the user, nothing is written.
    #[error("Debe seleccionar un archivo.")]
    MissingFile,

    #[error("El archivo está vacío.")]
    EmptyFile,

    #[error("Formato no soportado: '{0}'.")]
    UnsupportedFormat(String),

    #[error("El archivo XML no contiene datos reconocibles.")]
    NoRecognizableData,

    #[error("No hay datos para guardar en la base de datos.")]
    NothingToSave,

    #[error("Debe ingresar un nombre para la tabla.")]
    TableNameRequired,

    #[error("El nombre de tabla '{0}' solo puede contener letras, números, espacios, '-' y '_'.")]
    InvalidTableName(String),

    // File access and parsing
    #[error("Error al recibir el archivo: {0}")]
    Upload(String),

    #[error("No se pudo leer el archivo: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML inválido: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML inválido: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("XML inválido: {0}")]
    XmlEncoding(#[from] quick_xml::encoding::EncodingError),

    #[error("XML inválido: referencia a entidad desconocida '{0}'")]
    XmlEntity(String),

    #[error("XML inválido: '{0}' aparece como atributo y como elemento en la misma tabla.")]
    XmlNameCollision(String),

    #[error("Expresión regular inválida: {0}")]
    Pattern(#[from] regex::Error),

    #[error("La tarea terminó de forma inesperada: {0}")]
    Task(#[from] tokio::task::JoinError),

    // Database
    #[error("Error al guardar los datos: {0}")]
    DatabaseFile(std::io::Error),

    #[error("Error al guardar los datos: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Coarse classification used by the HTTP layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before anything was written.
    Input,
    /// Server-side failure unrelated to the user input.
    Internal,
    /// The save failed and its transaction was rolled back.
    Database,
}

impl ImportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::MissingFile
            | ImportError::EmptyFile
            | ImportError::UnsupportedFormat(_)
            | ImportError::NoRecognizableData
            | ImportError::NothingToSave
            | ImportError::TableNameRequired
            | ImportError::InvalidTableName(_)
            | ImportError::Upload(_)
            | ImportError::Xml(_)
            | ImportError::XmlAttribute(_)
            | ImportError::XmlEncoding(_)
            | ImportError::XmlEntity(_)
            | ImportError::XmlNameCollision(_) => ErrorKind::Input,
            ImportError::Io(_) | ImportError::Pattern(_) | ImportError::Task(_) => {
                ErrorKind::Internal
            }
            ImportError::DatabaseFile(_) | ImportError::Database(_) => ErrorKind::Database,
        }
    }
}
