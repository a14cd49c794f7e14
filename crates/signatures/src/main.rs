use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use federation_signatures::signing::{
    CanonicalRequest, SIGNATURE, SignatureParameters, extract_signature, parse_date,
};
use federation_signatures::{
    AppState, RequestComponents, SignedHeaders, Signer, Verb, Verifier, VerifierOptions, run,
};

#[derive(Parser)]
#[command(name = "fedsig")]
#[command(about = "Sign and verify federation requests")]
#[command(version)]
struct Cli {
    /// Tracing filter directives
    #[clap(long, env = "RUST_LOG", default_value = "info", global = true)]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the canonical string for a request
    Canonicalize {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// Sign a request and print the Date and Signature headers
    Sign {
        #[command(flatten)]
        request: RequestArgs,

        /// Base64 PKCS#8 Ed25519 private key
        #[clap(long, env = "FEDSIG_PRIVATE_KEY", hide_env_values = true)]
        private_key: String,

        /// Identity placed in the keyId parameter
        #[clap(long, env = "FEDSIG_KEY_ID")]
        key_id: String,

        /// Also print the signed string
        #[clap(long)]
        show_signed_string: bool,

        /// Print the result as JSON
        #[clap(long)]
        json: bool,
    },

    /// Verify a Signature header value against a request
    Verify {
        #[command(flatten)]
        request: RequestArgs,

        /// Base64 SPKI Ed25519 public key of the signer
        #[clap(long, env = "FEDSIG_PUBLIC_KEY")]
        public_key: String,

        /// Signature header value
        #[clap(long)]
        signature: String,

        /// Check every Signature parameter, not only the signature value
        #[clap(long, env = "FEDSIG_STRICT_HEADER", value_parser = BoolishValueParser::new())]
        strict_header: bool,
    },

    /// Run an inbox that only accepts requests signed by one key
    Serve {
        /// Base64 SPKI Ed25519 public key of the trusted signer
        #[clap(long, env = "FEDSIG_PUBLIC_KEY")]
        public_key: String,

        #[clap(long, env = "FEDSIG_HOST", default_value = "127.0.0.1")]
        host: String,

        #[clap(long, env = "FEDSIG_PORT", default_value = "3000")]
        port: u16,

        /// Accept requests with an empty body
        #[clap(long, env = "FEDSIG_ALLOW_EMPTY_BODY", value_parser = BoolishValueParser::new())]
        allow_empty_body: bool,

        /// Check every Signature parameter, not only the signature value
        #[clap(long, env = "FEDSIG_STRICT_HEADER", value_parser = BoolishValueParser::new())]
        strict_header: bool,
    },
}

#[derive(Args)]
struct RequestArgs {
    /// HTTP method
    #[clap(long, default_value = "GET")]
    method: Verb,

    /// Absolute request URL
    #[clap(long)]
    url: Url,

    /// Signing time (RFC 3339 or HTTP date); defaults to now when signing
    #[clap(long)]
    date: Option<String>,

    /// File holding the raw request body
    #[clap(long)]
    body_file: Option<PathBuf>,
}

impl RequestArgs {
    fn date(&self) -> Result<Option<DateTime<Utc>>> {
        self.date
            .as_deref()
            .map(parse_date)
            .transpose()
            .context("parsing --date")
    }

    fn body(&self) -> Result<Vec<u8>> {
        match &self.body_file {
            Some(path) => std::fs::read(path)
                .with_context(|| format!("reading body from {}", path.display())),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Serialize)]
struct SignOutput<'a> {
    date: &'a str,
    signature: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    signed_string: Option<&'a str>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::new(&cli.log))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Canonicalize { request } => {
            let body = request.body()?;
            let date = request.date()?.unwrap_or_else(Utc::now);
            let canonical = CanonicalRequest::from_url(request.method, &request.url, date, &body)?;
            print!("{}", canonical.signed_string());
        }
        Commands::Sign {
            request,
            private_key,
            key_id,
            show_signed_string,
            json,
        } => {
            let signer = Signer::from_private_key(&private_key, key_id)
                .context("loading signing key")?;
            let body = request.body()?;
            let mut components = RequestComponents::new()
                .method(request.method)
                .url(&request.url)
                .body(&body);
            if let Some(date) = request.date()? {
                components = components.date(date);
            }

            let SignedHeaders {
                headers,
                signed_string,
            } = signer.sign_components(&components, None)?;
            let date = headers[http::header::DATE].to_str()?;
            let signature = headers[SIGNATURE].to_str()?;

            if json {
                let output = SignOutput {
                    date,
                    signature,
                    signed_string: show_signed_string.then_some(signed_string.as_str()),
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("Date: {date}");
                println!("Signature: {signature}");
                if show_signed_string {
                    print!("\n{signed_string}");
                }
            }
        }
        Commands::Verify {
            request,
            public_key,
            signature,
            strict_header,
        } => {
            let verifier = Verifier::from_public_key(&public_key).context("loading public key")?;
            let Some(date) = request.date()? else {
                bail!("--date is required for verification");
            };
            let body = request.body()?;
            let signature = if strict_header {
                SignatureParameters::parse(&signature)?.signature_base64()
            } else {
                extract_signature(&signature)?
            };

            let valid = verifier.validate_components(
                &signature,
                &RequestComponents::new()
                    .method(request.method)
                    .url(&request.url)
                    .date(date)
                    .body(&body),
            )?;
            if !valid {
                bail!("invalid");
            }
            println!("valid");
        }
        Commands::Serve {
            public_key,
            host,
            port,
            allow_empty_body,
            strict_header,
        } => {
            let verifier = Verifier::from_public_key(&public_key)
                .context("loading public key")?
                .with_options(VerifierOptions {
                    allow_empty_body,
                    strict_header,
                });
            run(host, port, AppState::new(verifier)).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve_flags(args: &[&str]) -> (bool, bool) {
        let cli = Cli::try_parse_from(
            ["fedsig", "serve", "--public-key", "key"]
                .iter()
                .chain(args)
                .copied(),
        )
        .unwrap();
        match cli.command {
            Commands::Serve {
                allow_empty_body,
                strict_header,
                ..
            } => (allow_empty_body, strict_header),
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn boolean_flags_and_env_values() {
        assert_eq!(serve_flags(&["--strict-header"]), (false, true));
        assert_eq!(serve_flags(&["--allow-empty-body"]), (true, false));

        // SAFETY: this is the only test that touches these variables.
        unsafe {
            std::env::set_var("FEDSIG_STRICT_HEADER", "1");
            std::env::set_var("FEDSIG_ALLOW_EMPTY_BODY", "off");
        }
        let flags = serve_flags(&[]);
        unsafe {
            std::env::remove_var("FEDSIG_STRICT_HEADER");
            std::env::remove_var("FEDSIG_ALLOW_EMPTY_BODY");
        }
        assert_eq!(flags, (false, true));
    }
}
