//! # Ids Subcommand
//!
//! Renders the canonical ledger ids an issuer's artifacts get, or parses
//! one back into its components.

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use zkcred_core::{
    CredentialDefinitionId, Did, RevocationRegistryId, SchemaId, DEFAULT_TAG,
};

/// Arguments for the ids subcommand.
#[derive(Args, Debug)]
pub struct IdsArgs {
    /// Parse this id instead of rendering one.
    #[arg(long, conflicts_with_all = ["did", "name", "version"])]
    pub parse: Option<String>,

    /// Issuer DID.
    #[arg(long, required_unless_present = "parse")]
    pub did: Option<String>,

    /// Schema name.
    #[arg(long, required_unless_present = "parse")]
    pub name: Option<String>,

    /// Schema version.
    #[arg(long, required_unless_present = "parse")]
    pub version: Option<String>,

    /// Ledger sequence number of the schema. Needed for the credential
    /// definition and registry ids.
    #[arg(long)]
    pub seq_no: Option<u64>,

    /// Credential definition tag.
    #[arg(long, default_value = DEFAULT_TAG)]
    pub tag: String,

    /// Revocation registry tag.
    #[arg(long, default_value = DEFAULT_TAG)]
    pub registry_tag: String,

    /// Print as JSON.
    #[arg(long)]
    pub json: bool,
}

/// The ids for one schema lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedIds {
    pub schema_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev_reg_id: Option<String>,
}

/// Components recovered from a parsed id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ParsedId {
    Schema {
        issuer: String,
        name: String,
        version: String,
    },
    CredentialDefinition {
        issuer: String,
        schema_seq_no: u64,
        tag: String,
    },
    RevocationRegistry {
        issuer: String,
        cred_def_id: String,
        tag: String,
    },
}

/// Execute the ids subcommand.
pub fn run_ids(args: &IdsArgs) -> Result<u8> {
    if let Some(id) = &args.parse {
        let parsed = parse_id(id)?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        } else {
            match parsed {
                ParsedId::Schema { issuer, name, version } => {
                    println!("schema issued by {issuer}: {name} {version}");
                }
                ParsedId::CredentialDefinition { issuer, schema_seq_no, tag } => {
                    println!("credential definition by {issuer} on schema #{schema_seq_no}, tag {tag}");
                }
                ParsedId::RevocationRegistry { issuer, cred_def_id, tag } => {
                    println!("revocation registry by {issuer} for {cred_def_id}, tag {tag}");
                }
            }
        }
        return Ok(0);
    }

    let (Some(did), Some(name), Some(version)) = (&args.did, &args.name, &args.version) else {
        bail!("--did, --name and --version are required");
    };
    let ids = render_ids(did, name, version, args.seq_no, &args.tag, &args.registry_tag)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&ids)?);
    } else {
        println!("schema:    {}", ids.schema_id);
        if let Some(cd) = &ids.cred_def_id {
            println!("cred def:  {cd}");
        }
        if let Some(reg) = &ids.rev_reg_id {
            println!("registry:  {reg}");
        }
    }
    Ok(0)
}

/// Build the ids from components. Without `seq_no` only the schema id can
/// be rendered.
pub fn render_ids(
    did: &str,
    name: &str,
    version: &str,
    seq_no: Option<u64>,
    tag: &str,
    registry_tag: &str,
) -> Result<RenderedIds> {
    let did = Did::new(did)?;
    let schema_id = SchemaId::new(did.clone(), name, version)?;
    let Some(seq_no) = seq_no else {
        return Ok(RenderedIds {
            schema_id: schema_id.to_string(),
            cred_def_id: None,
            rev_reg_id: None,
        });
    };
    let cred_def_id = CredentialDefinitionId::new(did.clone(), seq_no, tag)?;
    let rev_reg_id = RevocationRegistryId::new(did, cred_def_id.clone(), registry_tag)?;
    Ok(RenderedIds {
        schema_id: schema_id.to_string(),
        cred_def_id: Some(cred_def_id.to_string()),
        rev_reg_id: Some(rev_reg_id.to_string()),
    })
}

/// Recognize any of the three id forms.
pub fn parse_id(id: &str) -> Result<ParsedId> {
    if let Ok(reg) = RevocationRegistryId::parse(id) {
        return Ok(ParsedId::RevocationRegistry {
            issuer: reg.issuer().to_string(),
            cred_def_id: reg.cred_def_id().to_string(),
            tag: reg.tag().to_string(),
        });
    }
    if let Ok(cd) = CredentialDefinitionId::parse(id) {
        return Ok(ParsedId::CredentialDefinition {
            issuer: cd.issuer().to_string(),
            schema_seq_no: cd.schema_seq_no(),
            tag: cd.tag().to_string(),
        });
    }
    let schema = SchemaId::parse(id)?;
    Ok(ParsedId::Schema {
        issuer: schema.issuer().to_string(),
        name: schema.name().to_string(),
        version: schema.version().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_full_lineage() {
        let ids = render_ids("did:sov:issuer1", "passport", "1.0", Some(12), "default", "r1")
            .unwrap();
        assert_eq!(ids.schema_id, "did:sov:issuer1:2:passport:1.0");
        assert_eq!(
            ids.cred_def_id.as_deref(),
            Some("did:sov:issuer1:3:CL:12:default")
        );
        assert_eq!(
            ids.rev_reg_id.as_deref(),
            Some("did:sov:issuer1:4:did:sov:issuer1:3:CL:12:default:CL_ACCUM:r1")
        );
    }

    #[test]
    fn schema_only_without_seq_no() {
        let ids = render_ids("did:sov:issuer1", "passport", "1.0", None, "default", "default")
            .unwrap();
        assert!(ids.cred_def_id.is_none());
        assert!(ids.rev_reg_id.is_none());
    }

    #[test]
    fn rejects_bad_components() {
        assert!(render_ids("issuer1", "passport", "1.0", None, "default", "default").is_err());
        assert!(render_ids("did:sov:issuer1", "pass:port", "1.0", None, "default", "default").is_err());
    }

    #[test]
    fn parses_each_form() {
        let parsed = parse_id("did:sov:issuer1:2:passport:1.0").unwrap();
        assert!(matches!(parsed, ParsedId::Schema { ref name, .. } if name == "passport"));

        let parsed = parse_id("did:sov:issuer1:3:CL:12:default").unwrap();
        assert!(matches!(parsed, ParsedId::CredentialDefinition { schema_seq_no: 12, .. }));

        let parsed =
            parse_id("did:sov:issuer1:4:did:sov:issuer1:3:CL:12:default:CL_ACCUM:r1").unwrap();
        match parsed {
            ParsedId::RevocationRegistry { cred_def_id, tag, .. } => {
                assert_eq!(cred_def_id, "did:sov:issuer1:3:CL:12:default");
                assert_eq!(tag, "r1");
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(parse_id("not-an-id").is_err());
    }
}
