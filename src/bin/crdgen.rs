//! # CRD Generator
//!
//! Prints the Kubernetes CustomResourceDefinitions of the operator as YAML.
//!
//! ## Usage
//!
//! ```bash
//! # Both CRDs, as one multi-document stream
//! cargo run --bin crdgen > config/crd/grafana-operator.yaml
//!
//! # A single CRD
//! cargo run --bin crdgen -- --kind dashboard | kubectl apply -f -
//! ```

use clap::{Parser, ValueEnum};
use grafana_operator::crd::{GrafanaDashboard, GrafanaInstance};
use kube::core::CustomResourceExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    /// GrafanaInstance and GrafanaDashboard
    All,
    Instance,
    Dashboard,
}

/// Print the operator's CRDs as YAML
#[derive(Debug, Parser)]
#[command(name = "crdgen")]
struct Args {
    /// Which CRD to print
    #[arg(long, value_enum, default_value_t = Kind::All)]
    kind: Kind,
}

fn main() {
    let args = Args::parse();

    let crds = match args.kind {
        Kind::All => vec![GrafanaInstance::crd(), GrafanaDashboard::crd()],
        Kind::Instance => vec![GrafanaInstance::crd()],
        Kind::Dashboard => vec![GrafanaDashboard::crd()],
    };

    let mut documents = Vec::with_capacity(crds.len());
    for crd in &crds {
        match serde_yaml::to_string(crd) {
            Ok(yaml) => documents.push(yaml),
            Err(e) => {
                eprintln!("Failed to serialize CRD to YAML: {e}");
                std::process::exit(1);
            }
        }
    }

    print!("{}", documents.join("---\n"));
}
