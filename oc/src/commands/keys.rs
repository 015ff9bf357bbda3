//! Signing key commands

use anyhow::{Context, Result};
use oc_lib::httpsig::Ed25519Signer;
use oc_lib::{DefaultSecretResolver, SecretResolver};

pub fn generate() -> Result<()> {
    let signer = Ed25519Signer::generate()?;

    println!("Signing key generated.");
    println!();
    println!("  Private key: {}", signer.seed_hex());
    println!("  Public key:  {}", signer.public_key_hex());
    println!();
    println!("Add the public key to public_keys in the gateway configuration.");
    println!("WARNING: Save the private key securely. It will not be shown again.");

    Ok(())
}

pub async fn public(secret: &str) -> Result<()> {
    println!("{}", public_key_for(&DefaultSecretResolver, secret).await?);
    Ok(())
}

/// Loads a signing key through `resolver` and returns its hex public key.
pub async fn public_key_for(resolver: &dyn SecretResolver, secret: &str) -> Result<String> {
    let seed = resolver
        .load(secret)
        .await
        .context("Failed to load signing key")?;
    let signer = Ed25519Signer::from_hex_seed(&seed)?;
    Ok(signer.public_key_hex())
}
