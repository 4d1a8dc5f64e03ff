use std::sync::Arc;

use crate::config::Config;
use crate::email::SubmissionNotifier;
use crate::ids::IdGenerator;
use crate::store::RecordStore;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub ids: Arc<dyn IdGenerator>,
    pub config: Config,
    pub notifier: Option<Arc<SubmissionNotifier>>,
}
