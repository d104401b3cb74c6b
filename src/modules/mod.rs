pub mod config;
pub mod feed;
pub mod channel_feed;
pub mod projection;
pub mod engine;

pub mod models {
    pub mod lap;
    pub mod average_window;
    pub mod entry;
    pub mod scope;
    pub mod summary;
}

pub mod helpers {
    pub mod math;
    pub mod ranking;
    pub mod logging;
}
