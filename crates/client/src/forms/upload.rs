use std::cell::{Cell, RefCell};

use bizdesk_shared::ClientError;

use crate::api_client::UploadFile;
use crate::client::ProtocolClient;

pub(crate) const UPLOAD_IN_PROGRESS: &str = "An upload is already in progress";

/// Uploads for one binary field. At most one upload is in flight.
#[derive(Debug)]
pub struct FileUploader {
    field: &'static str,
    in_flight: Cell<bool>,
    url: RefCell<Option<String>>,
    last_error: RefCell<Option<ClientError>>,
}

struct InFlight<'a>(&'a Cell<bool>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl FileUploader {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            in_flight: Cell::new(false),
            url: RefCell::new(None),
            last_error: RefCell::new(None),
        }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn is_uploading(&self) -> bool {
        self.in_flight.get()
    }

    pub fn url(&self) -> Option<String> {
        self.url.borrow().clone()
    }

    pub fn last_error(&self) -> Option<ClientError> {
        self.last_error.borrow().clone()
    }

    pub async fn upload(&self, client: &ProtocolClient, file: UploadFile) -> Result<String, ClientError> {
        if self.in_flight.replace(true) {
            return Err(ClientError::Upload(UPLOAD_IN_PROGRESS.to_string()));
        }
        let _guard = InFlight(&self.in_flight);

        match client.upload(file).await {
            Ok(url) => {
                crate::log_info!("Uploaded {} to {}", self.field, url);
                *self.url.borrow_mut() = Some(url.clone());
                *self.last_error.borrow_mut() = None;
                Ok(url)
            }
            Err(err) => {
                crate::log_warn!("Upload for {} failed: {}", self.field, err);
                *self.last_error.borrow_mut() = Some(err.clone());
                Err(err)
            }
        }
    }
}
