use thiserror::Error;

#[derive(Error, Debug)]
pub enum FacewatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Camera error: {details}")]
    Camera { details: String },

    #[error("Detector error: {details}")]
    Detector { details: String },

    #[error("Vault error: {details}")]
    Vault { details: String },

    #[error("Registry error: {0}")]
    Registry(#[from] rusqlite::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("System error: {message}")]
    System { message: String },
}

impl FacewatchError {
    pub fn camera<S: Into<String>>(details: S) -> Self {
        Self::Camera {
            details: details.into(),
        }
    }

    pub fn detector<S: Into<String>>(details: S) -> Self {
        Self::Detector {
            details: details.into(),
        }
    }

    pub fn vault<S: Into<String>>(details: S) -> Self {
        Self::Vault {
            details: details.into(),
        }
    }

    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FacewatchError>;
