//! # CRD Generator
//!
//! Prints the CustomResourceDefinitions of the primary kinds as YAML.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/all.yaml
//! cargo run --bin crdgen -- --kind gitea | kubectl apply -f -
//! ```

use anyhow::Result;
use app_operator::crd::{Gitea, Matomo, MinioBucket};
use clap::{Parser, ValueEnum};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    Gitea,
    Matomo,
    MinioBucket,
}

impl Kind {
    fn crd(self) -> CustomResourceDefinition {
        match self {
            Kind::Gitea => Gitea::crd(),
            Kind::Matomo => Matomo::crd(),
            Kind::MinioBucket => MinioBucket::crd(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "crdgen", about = "Generate CRD manifests for app-operator")]
struct Cli {
    /// Only print the CRD of this kind
    #[arg(long, value_enum)]
    kind: Option<Kind>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let kinds = match cli.kind {
        Some(kind) => vec![kind],
        None => vec![Kind::Gitea, Kind::Matomo, Kind::MinioBucket],
    };

    let documents = kinds
        .into_iter()
        .map(|kind| serde_yaml::to_string(&kind.crd()))
        .collect::<Result<Vec<_>, _>>()?;
    print!("{}", documents.join("---\n"));
    Ok(())
}
