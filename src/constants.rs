//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Field manager / controller name used for server-side operations and labels
pub const OPERATOR_NAME: &str = "grafana-operator";

/// API group of the custom resources
pub const API_GROUP: &str = "grafana.minicali.com";

/// Finalizer guarding removal of a dashboard from Grafana
pub const DASHBOARD_FINALIZER: &str = "finalizer.grafana.minicali.com";

/// Reserved folder name that maps to Grafana's built-in default folder
pub const GENERAL_FOLDER: &str = "General";

/// Default Grafana image for a GrafanaInstance
pub const DEFAULT_GRAFANA_IMAGE: &str = "grafana/grafana:10.0.0";

/// Default Grafana HTTP port
pub const DEFAULT_GRAFANA_PORT: i32 = 3000;

/// Default dashboard resync interval (seconds)
pub const DEFAULT_DASHBOARD_SYNC_SECS: u64 = 300;

/// Length of generated admin username and password
pub const CREDENTIAL_LENGTH: usize = 10;

/// Secret keys holding the generated admin credentials
pub const SECRET_USERNAME_KEY: &str = "admin_username";
pub const SECRET_PASSWORD_KEY: &str = "admin_password";

/// Annotation on the credentials Secret holding the fingerprint of its contents
pub const CHECKSUM_ANNOTATION: &str = "checksum";

/// Annotation on the credentials Secret noting who generated it
pub const GENERATED_BY_ANNOTATION: &str = "generated-by";

/// Annotation on the Deployment pod template mirroring the Secret checksum
pub const SECRET_CHECKSUM_ANNOTATION: &str = "secret-checksum";

/// Key of the rendered configuration inside the ConfigMap
pub const GRAFANA_INI_KEY: &str = "grafana.ini";

/// Where the Grafana container reads its configuration and keeps its data
pub const GRAFANA_CONFIG_MOUNT_PATH: &str = "/etc/grafana";
pub const GRAFANA_DATA_MOUNT_PATH: &str = "/var/lib/grafana";

/// Named container port targeted by the Service
pub const GRAFANA_CONTAINER_PORT_NAME: &str = "http-grafana";

/// Requested storage for the Grafana data volume
pub const DEFAULT_PVC_STORAGE: &str = "1Gi";

/// Grafana container user group, owns the data volume
pub const GRAFANA_FS_GROUP: i64 = 472;

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default timeout for a single Grafana API request (seconds)
pub const DEFAULT_GRAFANA_TIMEOUT_SECS: u64 = 5;

/// Default error backoff bounds (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Default delay before restarting a watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;
