//! Ticket creation pipeline: analyze the upload, classify the description,
//! persist the record. The three stages run synchronously within one
//! request; a failure at any stage leaves no partial ticket behind.

use std::sync::Arc;

use db::models::ticket::{CreateTicket, Ticket};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

use super::{
    classifier,
    image_store::{ImageStore, ImageStoreError},
    vision::{ImageAnalyzer, VisionClient, VisionError},
};

#[derive(Debug, Error)]
pub enum TicketPipelineError {
    #[error("not an image upload: {0}")]
    InvalidImage(String),
    #[error("image analysis failed: {0}")]
    Analysis(#[from] VisionError),
    #[error("failed to store upload: {0}")]
    Upload(#[from] ImageStoreError),
    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// One upload submitted through the ticket form.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub student_name: String,
    pub location: String,
    pub image_name: String,
    pub image_bytes: Vec<u8>,
}

pub struct TicketPipeline {
    pool: SqlitePool,
    images: ImageStore,
    analyzer: Arc<dyn ImageAnalyzer>,
}

impl TicketPipeline {
    pub fn new(pool: SqlitePool, images: ImageStore) -> Result<Self, TicketPipelineError> {
        let analyzer = Arc::new(VisionClient::from_env()?);
        Ok(Self::with_analyzer(pool, images, analyzer))
    }

    pub fn with_analyzer(
        pool: SqlitePool,
        images: ImageStore,
        analyzer: Arc<dyn ImageAnalyzer>,
    ) -> Self {
        Self {
            pool,
            images,
            analyzer,
        }
    }

    /// Run the fixed analyze -> classify -> persist sequence for one upload.
    ///
    /// The image is written to the store only after a successful analysis,
    /// so a failed analysis leaves neither a row nor a file. A failed insert
    /// removes the just-written file again.
    pub async fn create_ticket(
        &self,
        user_id: i64,
        request: NewTicket,
    ) -> Result<Ticket, TicketPipelineError> {
        let media_type = image_media_type(&request.image_name)?;

        let description = self
            .analyzer
            .describe(&request.image_bytes, &media_type)
            .await?;

        let (issue_type, priority) = classifier::classify(&description);
        info!(user_id, %issue_type, %priority, "classified upload");

        let image_path = self
            .images
            .save(&request.image_name, &request.image_bytes)
            .await?;

        let data = CreateTicket {
            user_id,
            student_name: request.student_name,
            location: request.location,
            issue_type,
            description,
            image_path: image_path.to_string_lossy().into_owned(),
            priority,
        };

        match Ticket::create(&self.pool, &data).await {
            Ok(ticket) => {
                info!(ticket_id = ticket.id, "ticket created");
                Ok(ticket)
            }
            Err(e) => {
                if let Err(cleanup) = self.images.remove(&image_path).await {
                    warn!(
                        path = %image_path.display(),
                        error = %cleanup,
                        "failed to remove upload after insert error"
                    );
                }
                Err(TicketPipelineError::Persistence(e))
            }
        }
    }
}

/// Resolve and gate the media type before anything is sent to the model.
fn image_media_type(filename: &str) -> Result<String, TicketPipelineError> {
    let mime = mime_guess::from_path(filename).first().ok_or_else(|| {
        TicketPipelineError::InvalidImage(format!("unrecognized file type: {filename}"))
    })?;
    if mime.type_() != mime_guess::mime::IMAGE {
        return Err(TicketPipelineError::InvalidImage(format!(
            "unsupported media type: {mime}"
        )));
    }
    Ok(mime.essence_str().to_string())
}
