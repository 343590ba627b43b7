pub mod manager;
pub mod render;

pub use manager::{analyze, run_analysis, AnalysisTicket, SessionManager, ViewState};
