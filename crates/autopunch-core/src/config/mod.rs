mod params;
mod schema;

pub use params::{ParamSpec, Params};
pub use schema::{
    BrowserConfig, Config, Credentials, EmailConfig, LocatorsConfig, ReportConfig, RetryConfig,
    ScheduleConfig, ServerConfig, TargetLocators, TargetUrl, TimingConfig, Viewport,
};
