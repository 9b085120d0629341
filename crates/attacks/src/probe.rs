//! Socket and tool helpers shared by the modules.
//!
//! Each helper runs under the session's cancel token and folds recoverable
//! failures (refused, timed out, garbled) into `None`/`false` so callers can
//! move to the next candidate. Cancellation and resource faults propagate.

use bluefang_common::{BdAddr, BlueResult, BtSocket, Transport};

use crate::module::AttackContext;

/// Largest single read any module asks for.
pub const RECV_MAX: usize = 1024;

pub(crate) fn recover<T>(ctx: &AttackContext, what: &str, res: BlueResult<T>) -> BlueResult<Option<T>> {
    match res {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_recoverable() => {
            ctx.log.detail(format!("{}: {}", what, e));
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

pub async fn open(
    ctx: &AttackContext,
    target: BdAddr,
    transport: Transport,
    channel: u16,
) -> BlueResult<Option<Box<dyn BtSocket>>> {
    let res = ctx
        .cancel
        .run(ctx.toolkit.sockets.connect(target, transport, channel, ctx.timeout()))
        .await;
    recover(ctx, &format!("{} {} connect", transport, channel), res)
}

/// True when the whole frame was handed to the socket.
pub async fn send(ctx: &AttackContext, sock: &mut dyn BtSocket, data: &[u8]) -> BlueResult<bool> {
    let res = ctx.cancel.run(sock.send(data, ctx.timeout())).await;
    Ok(recover(ctx, "send", res)?.is_some())
}

/// A non-empty reply, or `None` on timeout, error or close.
pub async fn recv(ctx: &AttackContext, sock: &mut dyn BtSocket) -> BlueResult<Option<Vec<u8>>> {
    recv_up_to(ctx, sock, RECV_MAX).await
}

pub async fn recv_up_to(
    ctx: &AttackContext,
    sock: &mut dyn BtSocket,
    max: usize,
) -> BlueResult<Option<Vec<u8>>> {
    let res = ctx.cancel.run(sock.recv(max, ctx.timeout())).await;
    Ok(recover(ctx, "recv", res)?.filter(|reply| !reply.is_empty()))
}

/// Open, send one frame, read one reply, close.
pub async fn exchange(
    ctx: &AttackContext,
    target: BdAddr,
    transport: Transport,
    channel: u16,
    frame: &[u8],
) -> BlueResult<Option<Vec<u8>>> {
    let Some(mut sock) = open(ctx, target, transport, channel).await? else {
        return Ok(None);
    };
    if !send(ctx, sock.as_mut(), frame).await? {
        return Ok(None);
    }
    recv(ctx, sock.as_mut()).await
}

/// Device-info text, or `None` when the peer did not answer.
pub async fn device_info(ctx: &AttackContext, target: BdAddr) -> BlueResult<Option<String>> {
    let res = ctx
        .cancel
        .run(ctx.toolkit.device_info.info(target, ctx.timeout()))
        .await;
    recover(ctx, "device info", res)
}

/// Service-record text, or `None` when discovery failed.
pub async fn browse(ctx: &AttackContext, target: BdAddr) -> BlueResult<Option<String>> {
    let res = ctx
        .cancel
        .run(ctx.toolkit.services.browse(target, ctx.timeout()))
        .await;
    recover(ctx, "service browse", res)
}

/// Scan `channels` in order and return the first that accepts a connection,
/// along with the open socket.
pub async fn first_open<I>(
    ctx: &AttackContext,
    target: BdAddr,
    transport: Transport,
    channels: I,
) -> BlueResult<Option<(u16, Box<dyn BtSocket>)>>
where
    I: IntoIterator<Item = u16> + Send,
    I::IntoIter: Send,
{
    for channel in channels {
        ctx.cancel.check()?;
        if let Some(sock) = open(ctx, target, transport, channel).await? {
            ctx.log.detail(format!("{} channel {} open", transport, channel));
            return Ok(Some((channel, sock)));
        }
    }
    Ok(None)
}
