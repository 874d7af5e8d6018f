use serde::Serialize;

/// A file handed back to the user, with the name it should be saved under.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileDownload {
    pub filename: String,
    pub content: Vec<u8>,
}

impl FileDownload {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}
