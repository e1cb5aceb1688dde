mod command;
mod http;
mod renderer;
mod ytdl;

pub use http::{HttpFetcher, StaticFetcher};
pub use renderer::{load_renderer, PageRenderer, RenderPlan};
#[cfg(test)]
pub use renderer::{scroll_until_stable, NoRenderer};
pub use ytdl::{FetchRequest, MediaFetcher, Progress, ProgressStatus, Ytdl};
