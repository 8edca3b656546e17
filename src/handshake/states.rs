// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! One marker struct per handshake step, each implementing `StateMachine`.
//! The plaintext and ciphered phases share the same `read_frame`/
//! `write_frame` calls; only whether `ctx.outgoing_cipher`/
//! `ctx.incoming_cipher` are `Some` changes between them.

use std::{future::Future, pin::Pin, time::Instant};

use anyhow::{Result, anyhow};
use num_bigint::BigUint;
use rand::RngExt;

use crate::{
    cfg::config::IncomingIds,
    codec::frame::InFrame,
    crypto::{cipher::AsymmetricCipher, rsa},
    error::SessionError,
    handshake::context::{HandshakeCtx, HandshakeStates, HandshakeStepOut},
    protocol::{composers, disconnect::classify},
    session::{
        io::{io_with_timeout, read_frame, write_frame},
        state::SessionStatus,
    },
    state_machine::common::{StateMachine, Transition},
    utils::format_mute_duration,
};

/// Checks a just-read frame against the two ways the server can end the
/// handshake early: an explicit ban or a disconnect-reason code. Shared by
/// every state that waits on a reply.
fn check_early_disconnect(ids: &IncomingIds, id: u16, body: &[u8]) -> Option<anyhow::Error> {
    if id == ids.explicit_ban {
        let mut r = InFrame::new(body);
        let reason = r.read_string();
        return Some(SessionError::Ban { reason }.into());
    }
    if id == ids.disconnect_reason {
        let mut r = InFrame::new(body);
        let code = r.read_i32();
        let (label, is_ban) = classify(code);
        return Some(if is_ban {
            SessionError::Ban { reason: label.to_string() }.into()
        } else {
            SessionError::Handshake(format!("server disconnected: {label} (code {code})")).into()
        });
    }
    None
}

#[derive(Debug)]
pub struct SendClientHello;

impl<'ctx> StateMachine<HandshakeCtx<'ctx>, HandshakeStates, Result<()>> for SendClientHello {
    type StepResult<'a>
        = Pin<Box<dyn Future<Output = HandshakeStepOut> + Send + 'a>>
    where
        Self: 'a,
        HandshakeCtx<'ctx>: 'a;

    fn step<'a>(self, ctx: &'a mut HandshakeCtx<'ctx>) -> Self::StepResult<'a> {
        Box::pin(async move {
            ctx.observers.notify_status(SessionStatus::PlaintextHandshake);

            let frame = composers::client_hello(
                &ctx.cfg.packet_ids.outgoing,
                &ctx.cfg.identity.release_version,
                &ctx.cfg.identity.client_type,
                ctx.cfg.identity.platform_id,
                ctx.cfg.identity.client_version,
            );
            if let Err(e) = write_frame(ctx.stream, &frame.finish(), &mut ctx.outgoing_cipher).await
            {
                return Transition::Done(Err(e.into()));
            }
            Transition::Next(HandshakeStates::SendDhInit(SendDhInit), Ok(()))
        })
    }
}

#[derive(Debug)]
pub struct SendDhInit;

impl<'ctx> StateMachine<HandshakeCtx<'ctx>, HandshakeStates, Result<()>> for SendDhInit {
    type StepResult<'a>
        = Pin<Box<dyn Future<Output = HandshakeStepOut> + Send + 'a>>
    where
        Self: 'a,
        HandshakeCtx<'ctx>: 'a;

    fn step<'a>(self, ctx: &'a mut HandshakeCtx<'ctx>) -> Self::StepResult<'a> {
        Box::pin(async move {
            let frame = composers::dh_init(&ctx.cfg.packet_ids.outgoing);
            if let Err(e) = write_frame(ctx.stream, &frame.finish(), &mut ctx.outgoing_cipher).await
            {
                return Transition::Done(Err(e.into()));
            }
            Transition::Next(HandshakeStates::AwaitDhServerInit(AwaitDhServerInit), Ok(()))
        })
    }
}

#[derive(Debug)]
pub struct AwaitDhServerInit;

impl<'ctx> StateMachine<HandshakeCtx<'ctx>, HandshakeStates, Result<()>> for AwaitDhServerInit {
    type StepResult<'a>
        = Pin<Box<dyn Future<Output = HandshakeStepOut> + Send + 'a>>
    where
        Self: 'a,
        HandshakeCtx<'ctx>: 'a;

    fn step<'a>(self, ctx: &'a mut HandshakeCtx<'ctx>) -> Self::StepResult<'a> {
        Box::pin(async move {
            loop {
                let read = io_with_timeout(
                    "await dh server init",
                    read_frame(ctx.stream, &mut ctx.incoming_cipher),
                    ctx.cfg.read_timeout,
                    ctx.cancel,
                )
                .await;
                let (id, body) = match read {
                    Ok(v) => v,
                    Err(e) => return Transition::Done(Err(e)),
                };

                if let Some(e) = check_early_disconnect(&ctx.cfg.packet_ids.incoming, id, &body) {
                    return Transition::Done(Err(e));
                }
                if id == ctx.cfg.packet_ids.incoming.ping {
                    // Ignored: the server may ping before the DH exchange
                    // finishes and there is nothing useful to pong with yet.
                    continue;
                }
                if id != ctx.cfg.packet_ids.incoming.server_dh_init {
                    return Transition::Done(Err(anyhow!(
                        "unexpected frame {id} while awaiting dh server init"
                    )));
                }

                let mut r = InFrame::new(&body);
                let p_block = r.read_string();
                let g_block = r.read_string();

                let (n, e) =
                    match rsa::load_key(&ctx.cfg.rsa.modulus_hex, &ctx.cfg.rsa.exponent_hex) {
                        Ok(v) => v,
                        Err(err) => return Transition::Done(Err(err)),
                    };
                // p and g arrive RSA-wrapped the same way the DH public keys
                // do, not as plain decimal text.
                let p = match rsa::verify_and_unpad(&n, &e, &p_block) {
                    Ok(v) => v,
                    Err(err) => return Transition::Done(Err(err)),
                };
                let g = match rsa::verify_and_unpad(&n, &e, &g_block) {
                    Ok(v) => v,
                    Err(err) => return Transition::Done(Err(err)),
                };
                ctx.p = Some(p);
                ctx.g = Some(g);
                return Transition::Next(HandshakeStates::SendDhComplete(SendDhComplete), Ok(()));
            }
        })
    }
}

#[derive(Debug)]
pub struct SendDhComplete;

impl<'ctx> StateMachine<HandshakeCtx<'ctx>, HandshakeStates, Result<()>> for SendDhComplete {
    type StepResult<'a>
        = Pin<Box<dyn Future<Output = HandshakeStepOut> + Send + 'a>>
    where
        Self: 'a,
        HandshakeCtx<'ctx>: 'a;

    fn step<'a>(self, ctx: &'a mut HandshakeCtx<'ctx>) -> Self::StepResult<'a> {
        Box::pin(async move {
            let p = ctx.p.clone().expect("p set by the previous state");
            let g = ctx.g.clone().expect("g set by the previous state");

            // A 15-byte (~120 bit) private exponent, same order of
            // magnitude the server itself uses.
            let mut priv_bytes = [0u8; 15];
            rand::rng().fill(&mut priv_bytes);
            let a = BigUint::from_bytes_be(&priv_bytes);
            let big_a = g.modpow(&a, &p);
            ctx.private_exponent = Some(a);

            let (n, e) = match rsa::load_key(&ctx.cfg.rsa.modulus_hex, &ctx.cfg.rsa.exponent_hex) {
                Ok(v) => v,
                Err(err) => return Transition::Done(Err(err)),
            };
            let encrypted_hex = match rsa::pad_and_encrypt(&n, &e, big_a.to_string().as_bytes()) {
                Ok(v) => v,
                Err(err) => return Transition::Done(Err(err)),
            };

            let frame = composers::dh_complete(&ctx.cfg.packet_ids.outgoing, &encrypted_hex);
            if let Err(e) = write_frame(ctx.stream, &frame.finish(), &mut ctx.outgoing_cipher).await
            {
                return Transition::Done(Err(e.into()));
            }
            Transition::Next(HandshakeStates::AwaitDhServerComplete(AwaitDhServerComplete), Ok(()))
        })
    }
}

#[derive(Debug)]
pub struct AwaitDhServerComplete;

impl<'ctx> StateMachine<HandshakeCtx<'ctx>, HandshakeStates, Result<()>> for AwaitDhServerComplete {
    type StepResult<'a>
        = Pin<Box<dyn Future<Output = HandshakeStepOut> + Send + 'a>>
    where
        Self: 'a,
        HandshakeCtx<'ctx>: 'a;

    fn step<'a>(self, ctx: &'a mut HandshakeCtx<'ctx>) -> Self::StepResult<'a> {
        Box::pin(async move {
            loop {
                let read = io_with_timeout(
                    "await dh server complete",
                    read_frame(ctx.stream, &mut ctx.incoming_cipher),
                    ctx.cfg.read_timeout,
                    ctx.cancel,
                )
                .await;
                let (id, body) = match read {
                    Ok(v) => v,
                    Err(e) => return Transition::Done(Err(e)),
                };

                if let Some(e) = check_early_disconnect(&ctx.cfg.packet_ids.incoming, id, &body) {
                    return Transition::Done(Err(e));
                }
                if id == ctx.cfg.packet_ids.incoming.ping {
                    let pong = composers::pong(&ctx.cfg.packet_ids.outgoing);
                    if let Err(e) =
                        write_frame(ctx.stream, &pong.finish(), &mut ctx.outgoing_cipher).await
                    {
                        return Transition::Done(Err(e.into()));
                    }
                    continue;
                }
                if id != ctx.cfg.packet_ids.incoming.server_dh_complete {
                    return Transition::Done(Err(anyhow!(
                        "unexpected frame {id} while awaiting dh server complete"
                    )));
                }

                let mut r = InFrame::new(&body);
                let hex_block = r.read_string();
                let bidirectional = r.read_bool();

                let (n, e) =
                    match rsa::load_key(&ctx.cfg.rsa.modulus_hex, &ctx.cfg.rsa.exponent_hex) {
                        Ok(v) => v,
                        Err(err) => return Transition::Done(Err(err)),
                    };
                let big_b = match rsa::verify_and_unpad(&n, &e, &hex_block) {
                    Ok(v) => v,
                    Err(err) => return Transition::Done(Err(err)),
                };
                let a = ctx
                    .private_exponent
                    .clone()
                    .expect("private exponent set by the previous state");
                let p = ctx.p.clone().expect("p set two states ago");
                let shared = big_b.modpow(&a, &p);
                let key_bytes = shared.to_bytes_be();
                if key_bytes.is_empty() {
                    return Transition::Done(Err(anyhow!("derived an empty dh shared secret")));
                }

                ctx.outgoing_cipher = Some(AsymmetricCipher::new(&key_bytes));
                ctx.bidirectional = bidirectional;
                if bidirectional {
                    ctx.incoming_cipher = Some(AsymmetricCipher::new(&key_bytes));
                }

                return Transition::Next(HandshakeStates::InstallCiphers(InstallCiphers), Ok(()));
            }
        })
    }
}

#[derive(Debug)]
pub struct InstallCiphers;

impl<'ctx> StateMachine<HandshakeCtx<'ctx>, HandshakeStates, Result<()>> for InstallCiphers {
    type StepResult<'a>
        = Pin<Box<dyn Future<Output = HandshakeStepOut> + Send + 'a>>
    where
        Self: 'a,
        HandshakeCtx<'ctx>: 'a;

    fn step<'a>(self, ctx: &'a mut HandshakeCtx<'ctx>) -> Self::StepResult<'a> {
        Box::pin(async move {
            ctx.observers.notify_status(SessionStatus::CipheredHandshake);
            Transition::Next(HandshakeStates::SendLoginTriad(SendLoginTriad), Ok(()))
        })
    }
}

#[derive(Debug)]
pub struct SendLoginTriad;

impl<'ctx> StateMachine<HandshakeCtx<'ctx>, HandshakeStates, Result<()>> for SendLoginTriad {
    type StepResult<'a>
        = Pin<Box<dyn Future<Output = HandshakeStepOut> + Send + 'a>>
    where
        Self: 'a,
        HandshakeCtx<'ctx>: 'a;

    fn step<'a>(self, ctx: &'a mut HandshakeCtx<'ctx>) -> Self::StepResult<'a> {
        Box::pin(async move {
            let ids = &ctx.cfg.packet_ids.outgoing;

            // The locale argument has never varied in the wild; it is a
            // protocol constant, not something callers configure.
            let version_check = composers::version_check(ids, 401, &ctx.cfg.identity.external_variables_url);
            if let Err(e) =
                write_frame(ctx.stream, &version_check.finish(), &mut ctx.outgoing_cipher).await
            {
                return Transition::Done(Err(e.into()));
            }

            let unique_id = composers::unique_id(
                ids,
                &ctx.cfg.identity.device_fingerprint,
                &ctx.cfg.identity.platform_string,
            );
            if let Err(e) =
                write_frame(ctx.stream, &unique_id.finish(), &mut ctx.outgoing_cipher).await
            {
                return Transition::Done(Err(e.into()));
            }

            let sso_ticket = composers::sso_ticket(ids, ctx.ticket, ctx.elapsed_ms());
            if let Err(e) =
                write_frame(ctx.stream, &sso_ticket.finish(), &mut ctx.outgoing_cipher).await
            {
                return Transition::Done(Err(e.into()));
            }

            Transition::Next(HandshakeStates::AwaitAuthentication(AwaitAuthentication), Ok(()))
        })
    }
}

#[derive(Debug)]
pub struct AwaitAuthentication;

impl<'ctx> StateMachine<HandshakeCtx<'ctx>, HandshakeStates, Result<()>> for AwaitAuthentication {
    type StepResult<'a>
        = Pin<Box<dyn Future<Output = HandshakeStepOut> + Send + 'a>>
    where
        Self: 'a,
        HandshakeCtx<'ctx>: 'a;

    fn step<'a>(self, ctx: &'a mut HandshakeCtx<'ctx>) -> Self::StepResult<'a> {
        Box::pin(async move {
            let deadline = Instant::now() + ctx.cfg.auth_timeout;

            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Transition::Done(Err(SessionError::AuthTimeout.into()));
                }

                let read = io_with_timeout(
                    "await authentication",
                    read_frame(ctx.stream, &mut ctx.incoming_cipher),
                    remaining.min(ctx.cfg.read_timeout),
                    ctx.cancel,
                )
                .await;
                let (id, body) = match read {
                    Ok(v) => v,
                    Err(_) => return Transition::Done(Err(SessionError::AuthTimeout.into())),
                };

                if let Some(e) = check_early_disconnect(&ctx.cfg.packet_ids.incoming, id, &body) {
                    return Transition::Done(Err(e));
                }

                let incoming_ids = &ctx.cfg.packet_ids.incoming;
                if id == incoming_ids.ping {
                    let pong = composers::pong(&ctx.cfg.packet_ids.outgoing);
                    if let Err(e) =
                        write_frame(ctx.stream, &pong.finish(), &mut ctx.outgoing_cipher).await
                    {
                        return Transition::Done(Err(e.into()));
                    }
                    continue;
                }
                if id == incoming_ids.flood_control {
                    let mut r = InFrame::new(&body);
                    let seconds = r.read_i32();
                    ctx.observers.notify_mute(format_mute_duration(seconds));
                    continue;
                }
                if id == incoming_ids.authentication_ok {
                    ctx.observers.notify_status(SessionStatus::Authenticated);
                    let info_retrieve = composers::info_retrieve(&ctx.cfg.packet_ids.outgoing);
                    if let Err(e) = write_frame(
                        ctx.stream,
                        &info_retrieve.finish(),
                        &mut ctx.outgoing_cipher,
                    )
                    .await
                    {
                        return Transition::Done(Err(e.into()));
                    }
                    return Transition::Done(Ok(()));
                }

                // Anything else arriving before authentication-ok (a stray
                // users list, a noobness-level push) is simply ignored.
            }
        })
    }
}
