//! `parlance config`: print configuration.

use parlance_config::AppConfig;

pub fn run(config: &AppConfig, effective: bool) {
    if effective {
        println!("{config:#?}");
        return;
    }

    println!(
        "# Default configuration. Save as {}",
        AppConfig::config_dir().join("config.toml").display()
    );
    println!();
    print!("{}", AppConfig::default_toml());
}
