//! `queuectl config show|set` — generalizes `cmd/config.go`'s `ConfigCmd`.

use queuectl_core::Config;

pub fn show(cfg: &Config) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(cfg)?);
    Ok(())
}

pub fn set(key: String, value: String) -> anyhow::Result<()> {
    let mut cfg = queuectl_core::config::load()?;
    queuectl_core::config::set_key(&mut cfg, &key, &value)?;
    queuectl_core::config::save(&cfg)?;
    println!("{key} = {value}");
    Ok(())
}
