//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 端到端发布链路测试（配置 -> 运行时 -> Hub 订阅者）

#[cfg(test)]
mod contract_tests {
    use contracts::org_channel;

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_address_contract() {
        assert_eq!(org_channel::encode(1, "weather").unwrap(), "1/weather");
        let (org, id) = org_channel::decode("1/weather").unwrap();
        assert_eq!((org, id.as_str()), (1, "weather"));
        assert!(org_channel::decode("not:a:valid::address").is_err());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{Frame, OrgRole, SignedInUser};
    use dispatcher::{create_runtime, DispatchError, LiveRuntime, Route, Step};
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio_util::sync::CancellationToken;

    const CONFIG: &str = r#"
version = "V1"

[dispatcher]
call_timeout_ms = 1000

[hub]
channel_capacity = 64

[[rules]]
org_id = 1
channel = "weather"
converter = "json_auto"

[[rules.outputs]]
type = "broadcast"

[[rules.outputs]]
type = "log"

[[rules]]
org_id = 2
channel = "forecast"
converter = "json_frame"

[[rules.outputs]]
type = "broadcast"
channel = "dashboards/forecast"

[[datasources]]
org_id = 1
uid = "ds-weather"
name = "Weather"
plugin_id = "influxdb"
url = "http://influx:8086"
"#;

    fn runtime() -> LiveRuntime {
        let config = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        create_runtime(&config).unwrap()
    }

    /// No rule: raw payload reaches subscribers of the original channel
    #[tokio::test]
    async fn test_e2e_raw_broadcast() {
        let runtime = runtime();
        let cancel = CancellationToken::new();
        let mut sub = runtime.hub.subscribe("1/traffic").unwrap();

        let route = runtime
            .dispatcher
            .publish_local(&cancel, "1/traffic", Bytes::from_static(b"23C"))
            .await
            .unwrap();

        assert_eq!(route, Route::Broadcast);
        let publication = sub.recv().await.unwrap();
        assert_eq!(publication.data, Bytes::from_static(b"23C"));
        assert!(publication.position.is_none());
    }

    /// Rule: converted frame reaches the output channel, nothing raw
    #[tokio::test]
    async fn test_e2e_rule_pipeline() {
        let runtime = runtime();
        let cancel = CancellationToken::new();
        let mut raw = runtime.hub.subscribe("1/weather").unwrap();
        let mut stream = runtime.hub.subscribe("1/stream/weather").unwrap();

        let route = runtime
            .dispatcher
            .publish_local(&cancel, "1/weather", Bytes::from_static(br#"{"temp": 23}"#))
            .await
            .unwrap();

        assert_eq!(route, Route::Pipeline);
        let publication = stream.recv().await.unwrap();
        let frame: Frame = serde_json::from_slice(&publication.data).unwrap();
        assert_eq!(frame.name, "weather");
        assert_eq!(frame.fields["temp"], serde_json::json!(23));
        assert!(matches!(raw.try_recv(), Err(TryRecvError::Empty)));
    }

    /// Same channel id in another org has no rule
    #[tokio::test]
    async fn test_e2e_rules_are_org_scoped() {
        let runtime = runtime();
        let cancel = CancellationToken::new();
        let mut other_org = runtime.hub.subscribe("3/weather").unwrap();

        let route = runtime
            .dispatcher
            .publish_local(&cancel, "3/weather", Bytes::from_static(b"not json"))
            .await
            .unwrap();

        assert_eq!(route, Route::Broadcast);
        assert_eq!(
            other_org.recv().await.unwrap().data,
            Bytes::from_static(b"not json")
        );
    }

    #[tokio::test]
    async fn test_e2e_json_frame_to_explicit_output() {
        let runtime = runtime();
        let cancel = CancellationToken::new();
        let mut dashboard = runtime.hub.subscribe("2/dashboards/forecast").unwrap();

        runtime
            .dispatcher
            .publish_local(
                &cancel,
                "2/forecast",
                Bytes::from_static(br#"{"name": "tomorrow", "fields": {"rain": 0.4}}"#),
            )
            .await
            .unwrap();

        let frame: Frame = serde_json::from_slice(&dashboard.recv().await.unwrap().data).unwrap();
        assert_eq!(frame.name, "tomorrow");
    }

    /// Conversion failure surfaces and nothing is delivered anywhere
    #[tokio::test]
    async fn test_e2e_conversion_failure_no_fallback() {
        let runtime = runtime();
        let cancel = CancellationToken::new();
        let mut raw = runtime.hub.subscribe("1/weather").unwrap();
        let mut stream = runtime.hub.subscribe("1/stream/weather").unwrap();

        let err = runtime
            .dispatcher
            .publish_local(&cancel, "1/weather", Bytes::from_static(b"23C"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Gateway {
                step: Step::Convert,
                ..
            }
        ));
        assert!(matches!(raw.try_recv(), Err(TryRecvError::Empty)));
        assert!(matches!(stream.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(runtime.dispatcher.metrics().failure_count(), 1);
    }

    /// Removing a rule switches the channel to raw broadcast
    #[tokio::test]
    async fn test_e2e_rule_removal() {
        let runtime = runtime();
        let cancel = CancellationToken::new();
        let mut raw = runtime.hub.subscribe("1/weather").unwrap();

        assert!(runtime.registry.remove(1, &"weather".into()));

        let route = runtime
            .dispatcher
            .publish_local(&cancel, "1/weather", Bytes::from_static(b"23C"))
            .await
            .unwrap();
        assert_eq!(route, Route::Broadcast);
        assert_eq!(raw.recv().await.unwrap().data, Bytes::from_static(b"23C"));
    }

    #[tokio::test]
    async fn test_e2e_cancelled_publish_delivers_nothing() {
        let runtime = runtime();
        let cancel = CancellationToken::new();
        let mut sub = runtime.hub.subscribe("1/traffic").unwrap();
        cancel.cancel();

        let err = runtime
            .dispatcher
            .publish_local(&cancel, "1/traffic", Bytes::from_static(b"23C"))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Cancelled { .. }));
        assert!(matches!(sub.try_recv(), Err(TryRecvError::Empty)));
    }

    /// Many concurrent publishers, every subscriber sees every message
    #[tokio::test]
    async fn test_e2e_concurrent_publishers() {
        let runtime = Arc::new(runtime());
        let mut subs: Vec<_> = (0..3)
            .map(|_| runtime.hub.subscribe("5/ticks").unwrap())
            .collect();
        assert_eq!(runtime.subscribers.count("5/ticks"), 3);

        let mut handles = Vec::new();
        for i in 0..20u32 {
            let runtime = Arc::clone(&runtime);
            handles.push(tokio::spawn(async move {
                let cancel = CancellationToken::new();
                runtime
                    .dispatcher
                    .publish_local(&cancel, "5/ticks", Bytes::from(i.to_string()))
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), Route::Broadcast);
        }

        for sub in &mut subs {
            let mut received = 0;
            while let Ok(Ok(_)) =
                tokio::time::timeout(Duration::from_millis(100), sub.recv()).await
            {
                received += 1;
            }
            assert_eq!(received, 20);
        }
        assert_eq!(runtime.dispatcher.metrics().broadcast_count(), 20);
    }

    #[tokio::test]
    async fn test_e2e_plugin_context() {
        let runtime = runtime();
        let user = SignedInUser {
            user_id: 1,
            org_id: 1,
            login: "admin".into(),
            org_role: OrgRole::Admin,
        };

        let ctx = runtime
            .contexts
            .get_plugin_context(&user, "influxdb", "ds-weather", false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ctx.datasource.unwrap().url, "http://influx:8086");

        let missing = runtime
            .contexts
            .get_plugin_context(&user, "influxdb", "ds-unknown", true)
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
