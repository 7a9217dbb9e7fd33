use std::env;

pub const DEFAULT_BROKER_HOST: &str = "192.168.42.253";
pub const DEFAULT_TOPIC: &str = "zuhause/haus/esszimmer/infomonitor/bildschirm/status";
pub const DEFAULT_ON_COMMAND: &str =
    "vcgencmd display_power 1 2>&1 | /usr/bin/logger -t 'HDMI-Display ON'";
pub const DEFAULT_OFF_COMMAND: &str =
    "vcgencmd display_power 0 2>&1 | /usr/bin/logger -t 'HDMI-Display OFF'";

#[derive(Debug, Clone)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic: String,
    pub client_id: String,
    /// Sent as a u16 in the CONNECT packet.
    pub keep_alive_secs: u16,
}

#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// Interpreter used as `<shell> -c <command>`.
    pub shell: String,
    pub on_command: String,
    pub off_command: String,
}

fn env_optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.is_empty())
}

fn env_string_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    env_optional(lookup, key).unwrap_or_else(|| default.to_string())
}

/// Numeric settings only; surrounding whitespace is ignored.
fn env_or_default<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, String> {
    match env_optional(lookup, key) {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| format!("{key} has an invalid value: {v}")),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Unset or empty keys fall
    /// back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let config = Self {
            mqtt: MqttConfig {
                broker_host: env_string_or_default(&lookup, "MQTT_BROKER_HOST", DEFAULT_BROKER_HOST),
                broker_port: env_or_default(&lookup, "MQTT_BROKER_PORT", 1883)?,
                username: env_optional(&lookup, "MQTT_USERNAME"),
                password: env_optional(&lookup, "MQTT_PASSWORD"),
                topic: env_string_or_default(&lookup, "MQTT_TOPIC", DEFAULT_TOPIC),
                client_id: env_string_or_default(&lookup, "MQTT_CLIENT_ID", "mqtt-hdmi-controller"),
                keep_alive_secs: env_or_default(&lookup, "MQTT_KEEP_ALIVE_SECS", 30)?,
            },
            display: DisplayConfig {
                shell: env_string_or_default(&lookup, "DISPLAY_SHELL", "bash"),
                on_command: env_string_or_default(&lookup, "DISPLAY_ON_COMMAND", DEFAULT_ON_COMMAND),
                off_command: env_string_or_default(&lookup, "DISPLAY_OFF_COMMAND", DEFAULT_OFF_COMMAND),
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.mqtt.broker_host.trim().is_empty() {
            return Err("MQTT_BROKER_HOST must not be empty".into());
        }
        if self.mqtt.topic.trim().is_empty() {
            return Err("MQTT_TOPIC must not be empty".into());
        }
        // rumqttc asserts on keep-alives shorter than this
        if self.mqtt.keep_alive_secs < 5 {
            return Err("MQTT_KEEP_ALIVE_SECS must be >= 5".into());
        }
        if self.display.shell.trim().is_empty() {
            return Err("DISPLAY_SHELL must not be empty".into());
        }
        if self.display.on_command.trim().is_empty() || self.display.off_command.trim().is_empty() {
            return Err("DISPLAY_ON_COMMAND and DISPLAY_OFF_COMMAND must not be blank".into());
        }
        Ok(())
    }

    pub fn has_credentials(&self) -> bool {
        self.mqtt.username.is_some() && self.mqtt.password.is_some()
    }
}
