//! CLI commands for the engine
//!
//! Implements the offline side of the workflow: write templates, compute the
//! hash members sign, collect signatures, and check a bundle against a member
//! set before it is submitted.

use std::path::Path;

use crate::config::{EngineConfig, TxTemplate};
use crate::crypto::KeyPair;
use crate::engine::{Clock, SystemClock};
use crate::multisig::SignatureBundle;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Write a transaction template and a deploy template
pub fn cmd_bare(output: &Path, deploy: &Path) -> CliResult<()> {
    let now = SystemClock.now();

    TxTemplate::bare(now).save(output)?;
    println!("📝 Wrote tx template to {}", output.display());

    EngineConfig::bare().save(deploy)?;
    println!("📝 Wrote deploy template to {}", deploy.display());

    Ok(())
}

/// Print the hashes for the template at `input`
pub fn cmd_digest(input: &Path) -> CliResult<()> {
    let template = TxTemplate::load(input)?;
    let action = template.action()?;
    let domain = template.domain();

    println!("🔑 Transaction digest");
    println!("   ├─ Engine: {} (chain {})", template.msig_addr, template.chain_id);
    println!("   ├─ Target: {} ({})", action.target, action.mode);
    println!("   ├─ Nonce: {}", template.nonce);
    println!("   ├─ Domain separator: {}", domain.separator());
    println!(
        "   ├─ Action hash: {}",
        domain.action_hash(&action, template.nonce)
    );
    println!("   └─ Signing hash: {}", template.signing_hash()?);

    Ok(())
}

/// Sign the template at `input` and write the result to `output`
pub fn cmd_sign(input: &Path, output: &Path, private_key: &str) -> CliResult<()> {
    let mut template = TxTemplate::load(input)?;
    let key = KeyPair::from_private_key_hex(private_key)?;
    let signer = key.address();

    let hash = template.signing_hash()?;
    let parts = key.sign_hash(&hash);

    if let Err(e) = template.add_signature(signer, parts) {
        println!("❌ Did not sign: {}", e);
        println!("   Members must sign in ascending address order.");
        return Ok(());
    }

    template.save(output)?;
    println!("✍️  {} signed {}", signer, hash);
    println!("   {} signature(s) in {}", template.signers.len(), output.display());

    Ok(())
}

/// Check the collected signatures against the deploy file's member set
///
/// An unauthorized bundle is an error, so the exit status reflects it.
pub fn cmd_verify(input: &Path, deploy: &Path) -> CliResult<()> {
    let template = TxTemplate::load(input)?;
    let config = EngineConfig::load(deploy)?;
    let members = config.member_set()?;

    if template.msig_addr != config.address || template.chain_id != config.chain_id {
        println!(
            "⚠️  Template targets {} on chain {}, deploy file describes {} on chain {}",
            template.msig_addr, template.chain_id, config.address, config.chain_id
        );
    }

    let hash = template.signing_hash()?;
    let bundle: SignatureBundle = template.bundle();

    println!("🔍 Verifying against {} member set...", members.description());
    match bundle.verify(&hash, &members) {
        Ok(signers) => {
            println!("✅ Authorized by {} member(s)", signers.len());
            for signer in signers {
                println!("   └─ {}", signer);
            }
        }
        Err(e) => {
            println!("❌ Not authorized: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DEV_KEY_0: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_KEY_1: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    #[test]
    fn test_bare_sign_verify_flow() {
        let dir = TempDir::new().unwrap();
        let tx = dir.path().join("tx.json");
        let deploy = dir.path().join("deploy.json");

        cmd_bare(&tx, &deploy).unwrap();
        cmd_digest(&tx).unwrap();

        // Bare deploy members are dev keys 1 and 0, in that address order
        cmd_sign(&tx, &tx, DEV_KEY_1).unwrap();
        cmd_sign(&tx, &tx, DEV_KEY_0).unwrap();

        let template = TxTemplate::load(&tx).unwrap();
        assert_eq!(template.signers.len(), 2);

        let config = EngineConfig::load(&deploy).unwrap();
        let members = config.member_set().unwrap();
        let hash = template.signing_hash().unwrap();
        assert!(template.bundle().verify(&hash, &members).is_ok());

        cmd_verify(&tx, &deploy).unwrap();
    }

    #[test]
    fn test_out_of_order_sign_leaves_file_unchanged() {
        let dir = TempDir::new().unwrap();
        let tx = dir.path().join("tx.json");
        let deploy = dir.path().join("deploy.json");
        cmd_bare(&tx, &deploy).unwrap();

        cmd_sign(&tx, &tx, DEV_KEY_0).unwrap();
        cmd_sign(&tx, &tx, DEV_KEY_1).unwrap();

        let template = TxTemplate::load(&tx).unwrap();
        assert_eq!(template.signers.len(), 1);
    }

    #[test]
    fn test_bad_key_is_an_error() {
        let dir = TempDir::new().unwrap();
        let tx = dir.path().join("tx.json");
        let deploy = dir.path().join("deploy.json");
        cmd_bare(&tx, &deploy).unwrap();

        assert!(cmd_sign(&tx, &tx, "zz").is_err());
    }

    #[test]
    fn test_verify_fails_without_quorum() {
        let dir = TempDir::new().unwrap();
        let tx = dir.path().join("tx.json");
        let deploy = dir.path().join("deploy.json");
        cmd_bare(&tx, &deploy).unwrap();

        assert!(cmd_verify(&tx, &deploy).is_err());

        cmd_sign(&tx, &tx, DEV_KEY_1).unwrap();
        assert!(cmd_verify(&tx, &deploy).is_err());
    }
}
