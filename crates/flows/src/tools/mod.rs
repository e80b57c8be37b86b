//! A set of demo tools the flows offer to the model.

mod ask_user;
mod menu;
mod search_web;
mod temperature;
mod weather;

pub use ask_user::{AskUserQuestion, AskUserTool};
pub use menu::{MenuIndex, MenuRagTool};
pub use search_web::SearchWebTool;
pub use temperature::TemperatureTool;
pub use weather::WeatherTool;
