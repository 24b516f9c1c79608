// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Certsrv Enrollment Command-Line Tool
//!
//! # Usage
//!
//! ```text
//! certsrv-enroll [OPTIONS] <COMMAND>
//!
//! Commands:
//!   check     Verify certsrv connectivity and credentials
//!   submit    Submit a CSR
//!   status    Fetch the state of an earlier request
//!   ca-cert   Print the current CA certificate
//!   ca-chain  Print the CA chain (first certificate as PEM)
//!
//! Options:
//!   -c, --config <PATH>   Path to settings file
//!   -s, --server <URL>    Override certsrv URL
//!   -v, --verbose         Enable verbose output
//!   -q, --quiet           Suppress non-error output
//! ```
//!
//! # Examples
//!
//! ```bash
//! # Submit a request with the configured template
//! certsrv-enroll --config /etc/certsrv/settings.toml submit --csr server.csr
//!
//! # Poll request 42 after a CA manager approved it
//! certsrv-enroll --config /etc/certsrv/settings.toml status --id 42
//!
//! # Show the CA fingerprint
//! certsrv-enroll --server https://ca.example.com/certsrv ca-cert --fingerprint
//! ```

use clap::{Parser, Subcommand};
use der::Decode;
use std::path::PathBuf;
use std::process::ExitCode;

use usg_certsrv_client::operations::{fingerprint, format_fingerprint};
use usg_certsrv_client::settings::{CertsrvSettings, ServerSettings};
use usg_certsrv_client::{
    CaChainMaterial, CertificateResponse, CertsrvClient, Outcome, RequestId,
};

/// Certsrv Enrollment Command-Line Tool
#[derive(Parser)]
#[command(name = "certsrv-enroll")]
#[command(author = "U.S. Federal Government")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Certificate enrollment through AD CS web enrollment", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to settings file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override certsrv URL
    #[arg(short, long, global = true, value_name = "URL")]
    server: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify certsrv connectivity and credentials
    Check,

    /// Submit a CSR
    Submit {
        /// PEM-encoded PKCS#10 request
        #[arg(long, value_name = "PATH")]
        csr: PathBuf,

        /// Certificate template (overrides settings)
        #[arg(long, value_name = "NAME")]
        template: Option<String>,
    },

    /// Fetch the state of an earlier request
    Status {
        /// Request id assigned by the CA
        #[arg(long, value_name = "ID")]
        id: String,
    },

    /// Print the current CA certificate
    CaCert {
        /// Print the SHA-256 fingerprint instead of the PEM
        #[arg(long)]
        fingerprint: bool,
    },

    /// Print the CA chain (first certificate as PEM)
    CaChain,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        tracing::Level::ERROR
    } else if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Create runtime for async operations
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run_command(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_command(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = load_settings(&cli)?;

    match &cli.command {
        Commands::Check => {
            settings.server.verify_on_connect = true;
            CertsrvClient::new(settings.into_config()?).await?;
            println!("certsrv reachable");
            Ok(())
        }
        Commands::Submit { csr, template } => {
            let template = template
                .clone()
                .unwrap_or_else(|| settings.enrollment.template.clone());
            let csr_pem = std::fs::read_to_string(csr)?;
            let client = CertsrvClient::new(settings.into_config()?).await?;
            let response = client.request_certificate(&csr_pem, &template).await?;
            print_response(&response);
            Ok(())
        }
        Commands::Status { id } => {
            let client = CertsrvClient::new(settings.into_config()?).await?;
            let response = client.get_existing_certificate(&RequestId::new(id.as_str())).await?;
            print_response(&response);
            Ok(())
        }
        Commands::CaCert { fingerprint } => {
            let client = CertsrvClient::new(settings.into_config()?).await?;
            let material = client.get_ca_certificate().await?;
            if *fingerprint {
                print_fingerprint(&material)?;
            } else {
                print!("{}", material.to_pem()?);
            }
            Ok(())
        }
        Commands::CaChain => {
            let client = CertsrvClient::new(settings.into_config()?).await?;
            let material = client.get_ca_certificate_chain().await?;
            print!("{}", material.to_pem()?);
            Ok(())
        }
    }
}

/// Settings from `--config`, or a minimal anonymous setup from `--server`.
fn load_settings(cli: &Cli) -> Result<CertsrvSettings, Box<dyn std::error::Error>> {
    let mut settings = match (&cli.config, &cli.server) {
        (Some(path), _) => CertsrvSettings::load(path)?,
        (None, Some(url)) => CertsrvSettings {
            server: ServerSettings {
                url: url.clone(),
                timeout_secs: 30,
                verify_on_connect: false,
            },
            trust: Default::default(),
            authentication: Default::default(),
            enrollment: Default::default(),
        },
        (None, None) => return Err("either --config or --server is required".into()),
    };

    if let Some(url) = &cli.server {
        settings.server.url = url.clone();
    }

    Ok(settings)
}

fn print_response(response: &CertificateResponse) {
    println!("Status:     {}", response.status());
    println!("Request id: {}", response.request_id);
    match &response.outcome {
        Outcome::Ready { certificate } => {
            println!();
            print!("{}", String::from_utf8_lossy(certificate));
        }
        other => {
            if let Some(description) = other.description() {
                println!("Reason:     {}", description);
            }
        }
    }
}

fn print_fingerprint(material: &CaChainMaterial) -> Result<(), Box<dyn std::error::Error>> {
    let pem = pem::parse(material.to_pem()?)?;
    let cert = x509_cert::Certificate::from_der(pem.contents())?;

    println!("Subject:     {}", cert.tbs_certificate.subject);
    println!("Renewal:     {}", material.renewal);
    println!("Fingerprint: SHA256:{}", format_fingerprint(&fingerprint(pem.contents())));
    Ok(())
}
