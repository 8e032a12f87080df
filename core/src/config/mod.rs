mod load;
mod types;

pub use load::{get_c3d_data_dir, load_default, load_from};
pub use types::{
    AppConfig, FrontendConfig, GatewayConfig, LoggingConfig, RetentionPolicy, ServerConfig,
};
