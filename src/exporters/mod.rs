pub mod csv_exporter;
pub mod json_exporter;
pub mod types;

pub use csv_exporter::conversation_to_csv;
pub use json_exporter::{conversation_to_json, import_conversation};
pub use types::{ConversationExport, ImportError};
