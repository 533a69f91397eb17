//! HTTP external resource analyzer
//!
//! Turns outbound HTTP client frames into external resource descriptors:
//! the captured request URI gives host and port, response headers give the
//! correlation tokens, and the root frame's record of templated URIs gives a
//! better label when the call used a substituted path.

use crate::error::TopologyResult;
use crate::uri::{parse_absolute, parse_host, sanitize_template};
use insight_core::color::{ColorManager, PaletteColorManager};
use insight_core::config::AnalyzerConfig;
use insight_core::naming::create_name;
use insight_core::operation::{fields, map_list, map_str, types, Operation, OperationMap};
use insight_core::tokens::TokenNames;
use insight_core::topology::{
    ExternalResourceAnalyzer, ExternalResourceDescriptor, ExternalResourceType,
};
use insight_core::trace::{Frame, FrameTree, Trace};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Correlation tokens echoed by an instrumented server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationTokens {
    pub app: Option<String>,
    pub server: Option<String>,
    pub endpoint: Option<String>,
}

impl CorrelationTokens {
    pub fn is_complete(&self) -> bool {
        self.app.is_some() && self.server.is_some() && self.endpoint.is_some()
    }
}

/// Analyzer for HTTP client frames
pub struct HttpExternalResourceAnalyzer {
    tokens: TokenNames,
    colors: Arc<dyn ColorManager>,
    operation_types: Vec<String>,
}

impl HttpExternalResourceAnalyzer {
    pub fn new(tokens: TokenNames, colors: Arc<dyn ColorManager>) -> Self {
        Self {
            tokens,
            colors,
            operation_types: vec![
                types::HTTP_CLIENT.to_string(),
                types::SPRING_REST_TEMPLATE.to_string(),
            ],
        }
    }

    pub fn from_config(config: &AnalyzerConfig) -> Self {
        let colors = PaletteColorManager::new(config.analysis.colors.clone());
        let mut analyzer = Self::new(config.tokens.clone(), Arc::new(colors));
        analyzer.operation_types = config.analysis.operation_types.clone();
        analyzer
    }

    pub fn with_operation_types(mut self, operation_types: Vec<String>) -> Self {
        self.operation_types = operation_types;
        self
    }

    /// Build a descriptor for one frame.
    ///
    /// Returns `None` when the frame carries no request URI or when the URI
    /// cannot be parsed; the latter is logged.
    pub fn extract_descriptor(
        &self,
        tree: &FrameTree<'_>,
        frame: &Frame,
    ) -> Option<ExternalResourceDescriptor> {
        match self.try_extract_descriptor(tree, frame) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    /// Like [`extract_descriptor`](Self::extract_descriptor), but reports
    /// the URI parse failure instead of logging it.
    pub fn try_extract_descriptor(
        &self,
        tree: &FrameTree<'_>,
        frame: &Frame,
    ) -> TopologyResult<Option<ExternalResourceDescriptor>> {
        let op = &frame.operation;
        let uri_value = match op
            .get_map(fields::REQUEST)
            .and_then(|request| map_str(request, fields::URI))
        {
            Some(value) if !value.is_empty() => value,
            _ => {
                tracing::trace!("Frame {} has no request URI", frame.frame_id);
                return Ok(None);
            }
        };

        let captured = parse_absolute(uri_value)?;
        let port = captured.port();
        let host = captured.host;

        let color = self.colors.color(op);
        let tokens = self.scan_tokens(op.get_map(fields::RESPONSE));

        let host_port = format!("{}:{}", host, port);
        let name = create_name(&host_port);
        let label = self
            .resolve_root_label(tree, frame, uri_value)
            .unwrap_or(host_port);

        Ok(Some(ExternalResourceDescriptor {
            frame_id: frame.frame_id.clone(),
            name,
            label,
            resource_type: ExternalResourceType::WebServer,
            vendor: None,
            host,
            port,
            color,
            incoming: false,
            app: tokens.app,
            server: tokens.server,
            endpoint: tokens.endpoint,
        }))
    }

    /// Scan response headers for the correlation tokens.
    ///
    /// The first occurrence of each token wins; the scan stops once all
    /// three are known.
    pub fn scan_tokens(&self, response: Option<&OperationMap>) -> CorrelationTokens {
        let mut tokens = CorrelationTokens::default();
        let Some(headers) = response.and_then(|r| map_list(r, fields::HEADERS)) else {
            return tokens;
        };

        for header in headers.iter().filter_map(Value::as_object) {
            let (Some(name), Some(value)) =
                (map_str(header, fields::NAME), map_str(header, fields::VALUE))
            else {
                continue;
            };

            if tokens.app.is_none() && self.tokens.is_application(name) {
                tokens.app = Some(value.to_string());
            } else if tokens.server.is_none() && self.tokens.is_server(name) {
                tokens.server = Some(value.to_string());
            } else if tokens.endpoint.is_none() && self.tokens.is_endpoint(name) {
                tokens.endpoint = Some(value.to_string());
            }

            if tokens.is_complete() {
                break;
            }
        }

        tokens
    }

    /// Recover the host of the original templated URI recorded on the
    /// trace's root frame for `resolved_uri`.
    pub fn resolve_root_label(
        &self,
        tree: &FrameTree<'_>,
        frame: &Frame,
        resolved_uri: &str,
    ) -> Option<String> {
        let root = if frame.is_root() {
            frame
        } else {
            let start = tree.get(&frame.frame_id)?;
            tree.root_of(start)?
        };

        let template = find_unresolved_uri(&root.operation, resolved_uri)?;
        if template.is_empty() {
            return None;
        }

        match parse_host(&sanitize_template(template)) {
            Ok(host) => Some(host),
            Err(e) => {
                warn!("{}; keeping host:port label", e);
                None
            }
        }
    }
}

impl Default for HttpExternalResourceAnalyzer {
    fn default() -> Self {
        Self::new(TokenNames::default(), Arc::new(PaletteColorManager::default()))
    }
}

impl ExternalResourceAnalyzer for HttpExternalResourceAnalyzer {
    fn name(&self) -> &str {
        "http-external-resource"
    }

    fn operation_types(&self) -> &[String] {
        &self.operation_types
    }

    fn locate_external_resources(
        &self,
        trace: &Trace,
        frames: &[&Frame],
    ) -> HashSet<ExternalResourceDescriptor> {
        let mut resources = HashSet::with_capacity(frames.len());
        if frames.is_empty() {
            return resources;
        }

        let tree = FrameTree::new(trace);
        for frame in frames {
            let Some(descriptor) = self.extract_descriptor(&tree, frame) else {
                continue;
            };

            if !resources.insert(descriptor) {
                tracing::trace!("Frame {} duplicates a known resource", frame.frame_id);
            }
        }

        debug!(
            "Trace {}: {} external resources from {} frames",
            trace.trace_id,
            resources.len(),
            frames.len()
        );
        resources
    }
}

fn find_unresolved_uri<'a>(root: &'a Operation, resolved_uri: &str) -> Option<&'a str> {
    root.get_map(fields::UNRESOLVED_URI)
        .and_then(|mapping| map_str(mapping, resolved_uri))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TopologyError;
    use insight_core::color::NoColor;
    use serde_json::json;
    use std::io::Write;
    use std::sync::Mutex;
    use tracing_subscriber::fmt::MakeWriter;

    fn analyzer() -> HttpExternalResourceAnalyzer {
        HttpExternalResourceAnalyzer::new(TokenNames::default(), Arc::new(NoColor))
    }

    fn client_op(uri: &str) -> Operation {
        Operation::new(types::HTTP_CLIENT).with_field(fields::REQUEST, json!({ "uri": uri }))
    }

    fn with_headers(op: Operation, headers: Value) -> Operation {
        op.with_field(fields::RESPONSE, json!({ "statusCode": 200, "headers": headers }))
    }

    /// Root frame plus one client child per operation
    fn trace_with(root: Operation, children: Vec<Operation>) -> Trace {
        let mut trace = Trace::new();
        let root = Frame::new(root);
        let kids: Vec<Frame> = children
            .into_iter()
            .map(|op| Frame::new(op).with_parent(&root))
            .collect();
        trace.push(root);
        for kid in kids {
            trace.push(kid);
        }
        trace
    }

    fn extract(trace: &Trace, idx: usize) -> Option<ExternalResourceDescriptor> {
        let tree = FrameTree::new(trace);
        analyzer().extract_descriptor(&tree, &trace.frames[idx])
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_missing_uri_gives_no_descriptor() {
        let trace = trace_with(
            Operation::new("http"),
            vec![
                Operation::new(types::HTTP_CLIENT),
                Operation::new(types::HTTP_CLIENT).with_field(fields::REQUEST, json!({})),
                client_op(""),
            ],
        );

        for idx in 1..=3 {
            assert!(extract(&trace, idx).is_none());
        }
        let frames: Vec<&Frame> = trace.frames.iter().skip(1).collect();
        assert!(analyzer().locate_external_resources(&trace, &frames).is_empty());
    }

    #[test]
    fn test_invalid_uri_is_reported() {
        let trace = trace_with(Operation::new("http"), vec![client_op("ht!tp://bad")]);
        let tree = FrameTree::new(&trace);

        let err = analyzer()
            .try_extract_descriptor(&tree, &trace.frames[1])
            .unwrap_err();
        assert!(matches!(err, TopologyError::InvalidUri { .. }));
        assert!(analyzer().extract_descriptor(&tree, &trace.frames[1]).is_none());
    }

    #[test]
    fn test_descriptor_fields() {
        let trace = trace_with(
            Operation::new("http"),
            vec![client_op("https://api.example.com/orders?id=1")],
        );

        let d = extract(&trace, 1).unwrap();
        assert_eq!(d.frame_id, trace.frames[1].frame_id);
        assert_eq!(d.host, "api.example.com");
        assert_eq!(d.port, 443);
        assert_eq!(d.label, "api.example.com:443");
        assert_eq!(d.name, create_name("api.example.com:443"));
        assert_eq!(d.resource_type, ExternalResourceType::WebServer);
        assert!(d.vendor.is_none());
        assert!(d.color.is_none());
        assert!(!d.incoming);
        assert!(d.app.is_none() && d.server.is_none() && d.endpoint.is_none());
    }

    #[test]
    fn test_explicit_port_and_http_default() {
        let trace = trace_with(
            Operation::new("http"),
            vec![
                client_op("https://api.example.com:9443/a"),
                client_op("http://api.example.com/a"),
                client_op("ftp://files.example.com/a"),
            ],
        );

        assert_eq!(extract(&trace, 1).unwrap().port, 9443);
        assert_eq!(extract(&trace, 2).unwrap().port, 80);
        assert_eq!(extract(&trace, 3).unwrap().port, 443);
    }

    #[test]
    fn test_uppercase_scheme_uses_secure_default() {
        let trace = trace_with(Operation::new("http"), vec![client_op("HTTP://api.example.com/x")]);

        let d = extract(&trace, 1).unwrap();
        assert_eq!(d.port, 443);
        assert_eq!(d.label, "api.example.com:443");
        assert_eq!(d.name, create_name("api.example.com:443"));
    }

    #[test]
    fn test_scheme_less_uri_is_not_extractable() {
        let trace = trace_with(
            Operation::new("http"),
            vec![client_op("api.example.com"), client_op("api.example.com:8080")],
        );
        let tree = FrameTree::new(&trace);

        for idx in 1..=2 {
            let result = analyzer().try_extract_descriptor(&tree, &trace.frames[idx]);
            assert!(matches!(result, Err(TopologyError::MissingHost(_))));
        }
    }

    #[test]
    fn test_overlong_uri_is_skipped() {
        let value = format!("http://api.example.com/{}", "a".repeat(70_000));
        let trace = trace_with(Operation::new("http"), vec![client_op(&value)]);
        let tree = FrameTree::new(&trace);

        let result = analyzer().try_extract_descriptor(&tree, &trace.frames[1]);
        assert!(matches!(result, Err(TopologyError::InvalidUri { .. })));
        assert!(extract(&trace, 1).is_none());
    }

    #[test]
    fn test_relative_uri_is_not_extractable() {
        let trace = trace_with(Operation::new("http"), vec![client_op("/orders/42")]);
        let tree = FrameTree::new(&trace);
        let result = analyzer().try_extract_descriptor(&tree, &trace.frames[1]);
        assert!(matches!(result, Err(TopologyError::MissingHost(_))));
    }

    #[test]
    fn test_scan_tokens_first_occurrence_wins() {
        let op = with_headers(
            client_op("http://api.example.com/a"),
            json!([
                { "name": "Content-Type", "value": "application/json" },
                { "name": "X-Insight-App-Token", "value": "app-1" },
                { "name": "X-Insight-App-Token", "value": "app-2" },
                { "name": "x-insight-server-token", "value": "srv-1" },
                { "name": "X-Insight-Endpoint-Token", "value": "ep-1" },
                { "name": "X-Insight-Server-Token", "value": "srv-2" }
            ]),
        );

        let tokens = analyzer().scan_tokens(op.get_map(fields::RESPONSE));
        assert_eq!(tokens.app.as_deref(), Some("app-1"));
        assert_eq!(tokens.server.as_deref(), Some("srv-1"));
        assert_eq!(tokens.endpoint.as_deref(), Some("ep-1"));
    }

    #[test]
    fn test_scan_tokens_tolerates_missing_data() {
        let a = analyzer();
        assert_eq!(a.scan_tokens(None), CorrelationTokens::default());

        let op = client_op("http://a/b").with_field(fields::RESPONSE, json!({ "statusCode": 204 }));
        assert_eq!(a.scan_tokens(op.get_map(fields::RESPONSE)), CorrelationTokens::default());

        let op = with_headers(
            client_op("http://a/b"),
            json!(["garbage", { "name": "X-Insight-App-Token" }, { "name": "X-Insight-Server-Token", "value": "s" }]),
        );
        let tokens = a.scan_tokens(op.get_map(fields::RESPONSE));
        assert!(tokens.app.is_none());
        assert_eq!(tokens.server.as_deref(), Some("s"));
    }

    #[test]
    fn test_configured_token_names() {
        let names = TokenNames {
            application: "X-App".to_string(),
            server: "X-Server".to_string(),
            endpoint: "X-Endpoint".to_string(),
        };
        let a = HttpExternalResourceAnalyzer::new(names, Arc::new(NoColor));
        let op = with_headers(
            client_op("http://a/b"),
            json!([{ "name": "X-App", "value": "svc1" }]),
        );
        assert_eq!(a.scan_tokens(op.get_map(fields::RESPONSE)).app.as_deref(), Some("svc1"));
    }

    #[test]
    fn test_root_label_from_unresolved_uri() {
        let root = Operation::new("http").with_field(
            fields::UNRESOLVED_URI,
            json!({ "http://10.0.0.1:8080/users/42": "http://10.0.0.1:8080/users/{id}" }),
        );
        let mut trace = trace_with(root, vec![Operation::new("controller")]);
        let leaf = Frame::new(client_op("http://10.0.0.1:8080/users/42")).with_parent(&trace.frames[1]);
        trace.push(leaf);

        let d = extract(&trace, 2).unwrap();
        assert_eq!(d.label, "10.0.0.1");
        assert_eq!(d.host, "10.0.0.1");
        assert_eq!(d.port, 8080);
        assert_eq!(d.name, create_name("10.0.0.1:8080"));
    }

    #[test]
    fn test_root_label_with_templated_host() {
        let root = Operation::new("http").with_field(
            fields::UNRESOLVED_URI,
            json!({ "http://orders.internal/a": "http://{service}.internal/a" }),
        );
        let trace = trace_with(root, vec![client_op("http://orders.internal/a")]);
        assert_eq!(extract(&trace, 1).unwrap().label, "service.internal");
    }

    #[test]
    fn test_root_frame_itself_is_consulted() {
        let op = client_op("http://10.0.0.1:8080/users/42").with_field(
            fields::UNRESOLVED_URI,
            json!({ "http://10.0.0.1:8080/users/42": "http://10.0.0.1:8080/users/{id}" }),
        );
        let mut trace = Trace::new();
        trace.push(Frame::new(op));
        assert_eq!(extract(&trace, 0).unwrap().label, "10.0.0.1");
    }

    #[test]
    fn test_root_label_fallbacks() {
        // No mapping at all
        let trace = trace_with(Operation::new("http"), vec![client_op("http://10.0.0.1:8080/users/42")]);
        assert_eq!(extract(&trace, 1).unwrap().label, "10.0.0.1:8080");

        // Mapping without the key
        let root = Operation::new("http").with_field(
            fields::UNRESOLVED_URI,
            json!({ "http://10.0.0.1:8080/users/7": "http://10.0.0.1:8080/users/{id}" }),
        );
        let trace = trace_with(root, vec![client_op("http://10.0.0.1:8080/users/42")]);
        assert_eq!(extract(&trace, 1).unwrap().label, "10.0.0.1:8080");

        // Template that still fails to parse
        let root = Operation::new("http").with_field(
            fields::UNRESOLVED_URI,
            json!({ "http://10.0.0.1:8080/users/42": "ht!tp://{bad}" }),
        );
        let trace = trace_with(root, vec![client_op("http://10.0.0.1:8080/users/42")]);
        assert_eq!(extract(&trace, 1).unwrap().label, "10.0.0.1:8080");
    }

    #[test]
    fn test_duplicate_calls_collapse() {
        let trace = trace_with(
            Operation::new("http"),
            vec![
                client_op("http://api.example.com/orders"),
                client_op("http://api.example.com/orders/7?expand=true"),
                client_op("http://api.example.com:8080/orders"),
            ],
        );
        let frames: Vec<&Frame> = trace.frames.iter().skip(1).collect();

        let resources = analyzer().locate_external_resources(&trace, &frames);
        assert_eq!(resources.len(), 2);
        let ports: HashSet<u16> = resources.iter().map(|d| d.port).collect();
        assert_eq!(ports, HashSet::from([80, 8080]));
    }

    #[test]
    fn test_empty_candidates() {
        let trace = Trace::new();
        assert!(analyzer().locate_external_resources(&trace, &[]).is_empty());
        assert!(analyzer().locate_in_trace(&trace).is_empty());
    }

    #[test]
    fn test_locate_in_trace_selects_client_frames() {
        let trace = trace_with(
            Operation::new("http"),
            vec![
                client_op("http://a.example.com/x"),
                Operation::new(types::SPRING_REST_TEMPLATE)
                    .with_field(fields::REQUEST, json!({ "uri": "https://b.example.com/y" })),
                Operation::new("jdbc").with_field(fields::REQUEST, json!({ "uri": "http://c.example.com/z" })),
            ],
        );

        let resources = analyzer().locate_in_trace(&trace);
        let hosts: HashSet<&str> = resources.iter().map(|d| d.host.as_str()).collect();
        assert_eq!(hosts, HashSet::from(["a.example.com", "b.example.com"]));

        let only_client = analyzer().with_operation_types(vec![types::HTTP_CLIENT.to_string()]);
        assert_eq!(only_client.locate_in_trace(&trace).len(), 1);
    }

    #[test]
    fn test_batch_skips_bad_frame_and_keeps_first_duplicate() {
        let trace = trace_with(
            Operation::new("http"),
            vec![
                client_op("http://api.example.com/orders"),
                with_headers(
                    client_op("http://api.example.com/orders"),
                    json!([{ "name": "X-App", "value": "svc1" }]),
                ),
                client_op("ht!tp://bad"),
            ],
        );
        let frames: Vec<&Frame> = trace.frames.iter().skip(1).collect();

        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let resources = tracing::subscriber::with_default(subscriber, || {
            analyzer().locate_external_resources(&trace, &frames)
        });

        assert_eq!(resources.len(), 1);
        let d = resources.iter().next().unwrap();
        assert_eq!(d.frame_id, trace.frames[1].frame_id);
        assert_eq!(d.label, "api.example.com:80");
        assert!(d.app.is_none());

        let output = logs.contents();
        assert_eq!(output.matches("WARN").count(), 1);
        assert!(output.contains("ht!tp://bad"));
    }

    #[test]
    fn test_tokens_do_not_split_resources() {
        let trace = trace_with(
            Operation::new("http"),
            vec![
                client_op("http://api.example.com/orders"),
                with_headers(
                    client_op("http://api.example.com/orders"),
                    json!([{ "name": "X-Insight-App-Token", "value": "svc1" }]),
                ),
            ],
        );
        let frames: Vec<&Frame> = trace.frames.iter().skip(1).collect();

        let resources = analyzer().locate_external_resources(&trace, &frames);
        assert_eq!(resources.len(), 1);
        assert!(resources.iter().next().unwrap().app.is_none());
    }

    #[test]
    fn test_from_config_colors() {
        let config = AnalyzerConfig::default();
        let trace = trace_with(Operation::new("http"), vec![client_op("http://a.example.com/x")]);
        let tree = FrameTree::new(&trace);
        let d = HttpExternalResourceAnalyzer::from_config(&config)
            .extract_descriptor(&tree, &trace.frames[1])
            .unwrap();
        assert!(d.color.is_some());
    }
}
