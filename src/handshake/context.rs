// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use num_bigint::BigUint;
use tokio_util::sync::CancellationToken;

use crate::{
    cfg::config::Config,
    crypto::cipher::AsymmetricCipher,
    handshake::states::{
        AwaitAuthentication, AwaitDhServerComplete, AwaitDhServerInit, InstallCiphers,
        SendClientHello, SendDhComplete, SendDhInit, SendLoginTriad,
    },
    session::{io::GameStream, observers::Observers},
    state_machine::common::{StateMachine, Transition},
};

/// Carries everything a handshake step needs: the socket, configuration,
/// the caller's SSO ticket, and the DH/RSA intermediates accumulated as
/// steps complete. Lives only for the duration of the handshake; the
/// session owns nothing from here except the two finished cipher states.
pub struct HandshakeCtx<'a> {
    pub stream: &'a mut GameStream,
    pub cfg: &'a Config,
    pub ticket: &'a str,
    pub observers: &'a Observers,
    pub cancel: &'a CancellationToken,

    pub started_at: Instant,

    pub p: Option<BigUint>,
    pub g: Option<BigUint>,
    pub private_exponent: Option<BigUint>,
    pub bidirectional: bool,

    pub outgoing_cipher: Option<AsymmetricCipher>,
    pub incoming_cipher: Option<AsymmetricCipher>,

    state: Option<HandshakeStates>,
}

impl<'a> HandshakeCtx<'a> {
    pub fn new(
        stream: &'a mut GameStream,
        cfg: &'a Config,
        ticket: &'a str,
        observers: &'a Observers,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            stream,
            cfg,
            ticket,
            observers,
            cancel,
            started_at: Instant::now(),
            p: None,
            g: None,
            private_exponent: None,
            bidirectional: false,
            outgoing_cipher: None,
            incoming_cipher: None,
            state: Some(HandshakeStates::SendClientHello(SendClientHello)),
        }
    }

    pub fn elapsed_ms(&self) -> i32 {
        self.started_at.elapsed().as_millis().min(i32::MAX as u128) as i32
    }
}

/// What a finished handshake hands back to the caller: the two cipher
/// states to install on the split read/write halves (`incoming_cipher` is
/// `None` when the server did not ask for bidirectional encryption).
#[derive(Debug)]
pub struct HandshakeOutcome {
    pub outgoing_cipher: Option<AsymmetricCipher>,
    pub incoming_cipher: Option<AsymmetricCipher>,
}

pub type HandshakeStepOut = Transition<HandshakeStates, Result<()>>;

#[derive(Debug)]
pub enum HandshakeStates {
    SendClientHello(SendClientHello),
    SendDhInit(SendDhInit),
    AwaitDhServerInit(AwaitDhServerInit),
    SendDhComplete(SendDhComplete),
    AwaitDhServerComplete(AwaitDhServerComplete),
    InstallCiphers(InstallCiphers),
    SendLoginTriad(SendLoginTriad),
    AwaitAuthentication(AwaitAuthentication),
}

/// Drives the handshake to completion, returning the installed cipher
/// pair once an authentication-ok frame has arrived and info-retrieve has
/// been sent.
pub async fn run_handshake(
    stream: &mut GameStream,
    cfg: &Config,
    ticket: &str,
    observers: &Observers,
    cancel: &CancellationToken,
) -> Result<HandshakeOutcome> {
    let mut ctx = HandshakeCtx::new(stream, cfg, ticket, observers, cancel);

    loop {
        let state = ctx.state.take().context("handshake state must be set")?;
        let transition = match state {
            HandshakeStates::SendClientHello(s) => s.step(&mut ctx).await,
            HandshakeStates::SendDhInit(s) => s.step(&mut ctx).await,
            HandshakeStates::AwaitDhServerInit(s) => s.step(&mut ctx).await,
            HandshakeStates::SendDhComplete(s) => s.step(&mut ctx).await,
            HandshakeStates::AwaitDhServerComplete(s) => s.step(&mut ctx).await,
            HandshakeStates::InstallCiphers(s) => s.step(&mut ctx).await,
            HandshakeStates::SendLoginTriad(s) => s.step(&mut ctx).await,
            HandshakeStates::AwaitAuthentication(s) => s.step(&mut ctx).await,
        };

        match transition {
            Transition::Next(next, Ok(())) => ctx.state = Some(next),
            Transition::Next(_, Err(e)) | Transition::Stay(Err(e)) => return Err(e),
            Transition::Stay(Ok(())) => {
                return Err(anyhow!("handshake state stayed without an error or a next state"));
            },
            Transition::Done(r) => {
                r?;
                return Ok(HandshakeOutcome {
                    outgoing_cipher: ctx.outgoing_cipher,
                    incoming_cipher: ctx.incoming_cipher,
                });
            },
        }
    }
}
