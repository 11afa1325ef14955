use crate::{
    config::Config, directory::IdentityResolver, services::upload::AttachmentUploader,
    store::Store, websocket::ConnectionRegistry,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub registry: ConnectionRegistry,
    pub directory: Arc<dyn IdentityResolver>,
    pub uploader: Arc<dyn AttachmentUploader>,
    pub config: Arc<Config>,
}
