//! Minimal OBEX client over an RFCOMM socket.

use bluefang_codec::obex;
use bluefang_common::{BdAddr, BlueResult, BtSocket, Transport};

use crate::module::AttackContext;
use crate::probe;

/// Upper bound on CONTINUE round-trips for one GET.
const MAX_CONTINUATIONS: usize = 64;

pub struct ObexSession {
    sock: Box<dyn BtSocket>,
    channel: u16,
}

impl ObexSession {
    /// Open `channel` and send CONNECT. `None` when the channel is closed or
    /// nothing answers.
    pub async fn connect(ctx: &AttackContext, target: BdAddr, channel: u16) -> BlueResult<Option<Self>> {
        let Some(mut sock) = probe::open(ctx, target, Transport::Rfcomm, channel).await? else {
            return Ok(None);
        };
        if !probe::send(ctx, sock.as_mut(), &obex::connect(obex::DEFAULT_MAX_PACKET, &[])).await? {
            return Ok(None);
        }
        let Some(reply) = probe::recv_up_to(ctx, sock.as_mut(), obex::DEFAULT_MAX_PACKET as usize).await? else {
            return Ok(None);
        };
        match obex::decode_response(&reply, true) {
            Ok(resp) => ctx
                .log
                .detail(format!("OBEX CONNECT on channel {} answered 0x{:02X}", channel, resp.code)),
            Err(e) => ctx
                .log
                .detail(format!("OBEX CONNECT on channel {} answered garbage: {}", channel, e)),
        }
        Ok(Some(Self { sock, channel }))
    }

    #[inline]
    pub fn channel(&self) -> u16 {
        self.channel
    }

    async fn request(&mut self, ctx: &AttackContext, frame: &[u8]) -> BlueResult<Option<obex::Response>> {
        if !probe::send(ctx, self.sock.as_mut(), frame).await? {
            return Ok(None);
        }
        let Some(reply) = probe::recv_up_to(ctx, self.sock.as_mut(), obex::DEFAULT_MAX_PACKET as usize).await? else {
            return Ok(None);
        };
        let decoded = obex::decode_response(&reply, false).map_err(Into::into);
        probe::recover(ctx, "OBEX response", decoded)
    }

    /// Pull an object. `None` unless the server ends with SUCCESS.
    pub async fn get(&mut self, ctx: &AttackContext, name: &str, mime: Option<&str>) -> BlueResult<Option<Vec<u8>>> {
        let mut body = Vec::new();
        let mut frame = obex::get(name, mime);
        for _ in 0..MAX_CONTINUATIONS {
            ctx.cancel.check()?;
            let Some(resp) = self.request(ctx, &frame).await? else {
                return Ok(None);
            };
            body.extend_from_slice(&resp.body);
            match resp.code | 0x80 {
                obex::response::CONTINUE => {
                    frame = obex::encode_packet(obex::opcode::GET_FINAL, &[], &[]);
                }
                obex::response::SUCCESS => return Ok(Some(body)),
                code => {
                    ctx.log.detail(format!("GET {} refused with 0x{:02X}", name, code));
                    return Ok(None);
                }
            }
        }
        ctx.log.warning(format!("GET {} did not finish", name));
        Ok(None)
    }

    /// Push one object in a single final PUT. True on SUCCESS/CONTINUE.
    pub async fn put(&mut self, ctx: &AttackContext, name: &str, body: &[u8]) -> BlueResult<bool> {
        Ok(self
            .request(ctx, &obex::put(name, body))
            .await?
            .is_some_and(|resp| resp.is_success()))
    }

    /// Best-effort DISCONNECT; the socket closes on drop either way.
    pub async fn disconnect(mut self, ctx: &AttackContext) -> BlueResult<()> {
        self.request(ctx, &obex::disconnect()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, target, MockConnector, Reply};
    use bluefang_codec::obex::{response, Header};

    fn success_with_body(body: &[u8]) -> Vec<u8> {
        obex::encode_packet(response::SUCCESS, &[], &[Header::end_of_body(body)])
    }

    #[tokio::test]
    async fn get_follows_continuations() {
        let connect_ok = obex::encode_packet(response::SUCCESS, &[0x10, 0x00, 0x10, 0x00], &[]);
        let first = obex::encode_packet(response::CONTINUE, &[], &[Header::body(b"BEGIN:")]);
        let last = success_with_body(b"VCARD");
        let connector = MockConnector::default().accept(
            Transport::Rfcomm,
            9,
            Reply::Script(vec![connect_ok, first, last]),
        );
        let ctx = context(connector.clone());
        let mut session = ObexSession::connect(&ctx, target(), 9).await.unwrap().unwrap();
        let body = session.get(&ctx, "telecom/pb.vcf", None).await.unwrap();
        assert_eq!(body.as_deref(), Some(&b"BEGIN:VCARD"[..]));

        let sent = connector.sent(Transport::Rfcomm, 9);
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0][0], obex::opcode::CONNECT);
        assert_eq!(sent[2], obex::encode_packet(obex::opcode::GET_FINAL, &[], &[]));
    }

    #[tokio::test]
    async fn refused_get_is_none() {
        let connector = MockConnector::default().accept(
            Transport::Rfcomm,
            9,
            Reply::Script(vec![
                obex::encode_packet(response::SUCCESS, &[0x10, 0x00, 0x10, 0x00], &[]),
                obex::encode_packet(response::NOT_FOUND, &[], &[]),
            ]),
        );
        let ctx = context(connector);
        let mut session = ObexSession::connect(&ctx, target(), 9).await.unwrap().unwrap();
        assert!(session.get(&ctx, "telecom/cal.vcs", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn silent_channel_has_no_session() {
        let ctx = context(MockConnector::default().accept(Transport::Rfcomm, 9, Reply::Silent));
        assert!(ObexSession::connect(&ctx, target(), 9).await.unwrap().is_none());
    }
}
