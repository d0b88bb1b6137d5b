use std::time::Duration;

use rumqttc::{AsyncClient, ConnectReturnCode, EventLoop, LastWill, MqttOptions, QoS};

use crate::config::MqttConfig;
use crate::error::{Error, Result};

/// Result code reported when the broker could not be reached at all.
pub const SOCKET_ERROR: i32 = -1;

/// Human-readable reason for an MQTT connection result code.
///
/// # Example
/// ```
/// use serialgw_common::session::connection_result_reason;
///
/// assert_eq!(connection_result_reason(0), "Success");
/// assert_eq!(connection_result_reason(5), "Not authorized");
/// ```
pub fn connection_result_reason(code: i32) -> &'static str {
    match code {
        -1 => "Socket Error",
        0 => "Success",
        1 => "Unsupported protocol version",
        2 => "Client ID rejected",
        3 => "Server unavailable",
        4 => "Bad credentials",
        5 => "Not authorized",
        _ => "Unknown result code",
    }
}

/// Numeric CONNACK result code, as defined by MQTT 3.1.1.
pub fn connection_result_code(code: ConnectReturnCode) -> i32 {
    match code {
        ConnectReturnCode::Success => 0,
        ConnectReturnCode::RefusedProtocolVersion => 1,
        ConnectReturnCode::BadClientId => 2,
        ConnectReturnCode::ServiceUnavailable => 3,
        ConnectReturnCode::BadUserNamePassword => 4,
        ConnectReturnCode::NotAuthorized => 5,
    }
}

/// Convert a numeric QoS level.
pub fn qos_from_level(level: u8) -> Result<QoS> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(Error::Mqtt(format!("Invalid QoS level: {}", other))),
    }
}

/// Build client options from the configuration.
///
/// `last_will` is an optional `(topic, payload)` the broker publishes,
/// retained, if the gateway disappears without disconnecting.
pub fn mqtt_options(
    config: &MqttConfig,
    last_will: Option<(String, Vec<u8>)>,
) -> Result<MqttOptions> {
    let client_id = config
        .client_id
        .clone()
        .unwrap_or_else(|| format!("serialgw-{}", std::process::id()));

    let mut options = MqttOptions::new(client_id, &config.broker_address, config.broker_port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

    if let Some((topic, payload)) = last_will {
        let qos = qos_from_level(config.qos)?;
        options.set_last_will(LastWill::new(topic, payload, qos, true));
    }

    Ok(options)
}

/// Create an MQTT client for the configured broker.
///
/// No network traffic happens until the returned event loop is polled.
pub fn connect(
    config: &MqttConfig,
    last_will: Option<(String, Vec<u8>)>,
) -> Result<(AsyncClient, EventLoop)> {
    let options = mqtt_options(config, last_will)?;

    tracing::info!(
        broker = %config.broker_addr(),
        client_id = %options.client_id(),
        keep_alive_secs = config.keep_alive_secs,
        "Creating MQTT client"
    );

    Ok(AsyncClient::new(options, config.request_capacity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_reasons() {
        assert_eq!(connection_result_reason(SOCKET_ERROR), "Socket Error");
        assert_eq!(connection_result_reason(0), "Success");
        assert_eq!(connection_result_reason(1), "Unsupported protocol version");
        assert_eq!(connection_result_reason(2), "Client ID rejected");
        assert_eq!(connection_result_reason(3), "Server unavailable");
        assert_eq!(connection_result_reason(4), "Bad credentials");
        assert_eq!(connection_result_reason(5), "Not authorized");
        assert_eq!(connection_result_reason(42), "Unknown result code");
    }

    #[test]
    fn test_result_codes() {
        assert_eq!(connection_result_code(ConnectReturnCode::Success), 0);
        assert_eq!(connection_result_code(ConnectReturnCode::BadClientId), 2);
        assert_eq!(connection_result_code(ConnectReturnCode::NotAuthorized), 5);
    }

    #[test]
    fn test_qos_from_level() {
        assert_eq!(qos_from_level(0).unwrap(), QoS::AtMostOnce);
        assert_eq!(qos_from_level(2).unwrap(), QoS::ExactlyOnce);
        assert!(qos_from_level(3).is_err());
    }

    #[test]
    fn test_mqtt_options() {
        let mut config = MqttConfig::new("192.168.1.190");
        config.client_id = Some("gateway".to_string());
        config.keep_alive_secs = 30;

        let options = mqtt_options(&config, None).unwrap();
        assert_eq!(options.client_id(), "gateway");
        assert_eq!(
            options.broker_address(),
            ("192.168.1.190".to_string(), 1883)
        );
        assert_eq!(options.keep_alive(), Duration::from_secs(30));
        assert!(options.last_will().is_none());
    }

    #[test]
    fn test_mqtt_options_last_will() {
        let config = MqttConfig::new("localhost");
        let options = mqtt_options(
            &config,
            Some(("gateway/status".to_string(), b"offline".to_vec())),
        )
        .unwrap();

        let will = options.last_will().unwrap();
        assert_eq!(will.qos, QoS::AtMostOnce);
        assert!(will.retain);
    }
}
