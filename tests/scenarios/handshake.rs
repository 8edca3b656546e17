// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Drives the nine-step handshake end to end against a hand-scripted
//! server sitting on the other end of an in-memory duplex stream: DH key
//! agreement through RSA-wrapped blocks, cipher installation, the login
//! triad, and the authentication wait.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{Result, anyhow};
use num_bigint::BigUint;
use roomwalker_core::{
    cfg::config::{
        Config, Identity, IncomingIds, Network, OutgoingIds, PacketIds, Personalization, RsaKey,
    },
    codec::frame::{InFrame, OutFrame},
    crypto::{cipher::AsymmetricCipher, rsa},
    handshake::run_handshake,
    session::{
        io::{GameStream, read_frame, write_frame},
        observers::Observers,
        state::SessionStatus,
    },
};
use tokio::io::DuplexStream;
use tokio_util::sync::CancellationToken;

/// A toy RSA modulus, large enough to hold the padded blocks this
/// handshake ever wraps (a few ASCII decimal digits) but far too small to
/// be a real key. Both sides here only ever modpow by the public
/// exponent, so a non-prime "modulus" works fine.
fn test_rsa_key() -> (String, String) {
    ("a5".repeat(64), "010001".to_string())
}

fn test_config() -> Config {
    Config {
        network: Network { host: "127.0.0.1".to_string(), port: 1, socks_proxy: None },
        identity: Identity {
            release_version: "TEST-1".to_string(),
            client_type: "WEB".to_string(),
            platform_id: 1,
            client_version: 1,
            external_variables_url: "https://example.test/vars".to_string(),
            platform_string: "WIN".to_string(),
            device_fingerprint: "fingerprint-123".to_string(),
        },
        rsa: {
            let (modulus_hex, exponent_hex) = test_rsa_key();
            RsaKey { modulus_hex, exponent_hex }
        },
        packet_ids: PacketIds {
            incoming: IncomingIds {
                server_dh_init: 1,
                server_dh_complete: 2,
                authentication_ok: 3,
                ping: 4,
                flood_control: 5,
                users: 6,
                user_remove: 7,
                floor_height_map: 8,
                height_map: 9,
                navigator_results: 10,
                flat_created: 11,
                user_object: 12,
                noobness_level: 13,
                position_update: 14,
                chat: 15,
                explicit_ban: 16,
                disconnect_reason: 17,
            },
            outgoing: OutgoingIds {
                client_hello: 100,
                dh_init: 101,
                dh_complete: 102,
                version_check: 103,
                unique_id: 104,
                sso_ticket: 105,
                info_retrieve: 106,
                pong: 107,
                latency_ping_request: 108,
                shout: 109,
                whisper: 110,
                walk: 111,
                join_room: 112,
                join_room_flat: 113,
                join_room_ready: 114,
                join_room_nav_request: 115,
                quit_room: 116,
                change_motto: 117,
                update_figure: 118,
                request_friend: 119,
                change_username: 120,
                dance: 121,
                sign: 122,
                change_posture: 123,
                respect_user: 124,
                replenish_respect: 125,
                reward_status: 126,
                reward_claim: 127,
                purchase_item: 128,
                effect_activate: 129,
                effect_select: 130,
                search_navigator: 131,
                select_initial_room: 132,
            },
        },
        admins: Vec::new(),
        admin_auto_leave: false,
        personalization: Personalization::default(),
        keepalive_interval: Duration::from_secs(20),
        auth_timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(5),
        read_timeout: Duration::from_secs(5),
    }
}

/// Plays the server side of the handshake: DH with a fixed toy `p`/`g`,
/// a fixed server-side private exponent, then the login triad followed by
/// an immediate authentication-ok.
async fn run_fake_server(mut server: DuplexStream, cfg: Config) -> Result<()> {
    let ids = cfg.packet_ids.incoming.clone();
    let out_ids = cfg.packet_ids.outgoing.clone();
    let (n, e) = rsa::load_key(&cfg.rsa.modulus_hex, &cfg.rsa.exponent_hex)?;

    let mut incoming_cipher: Option<AsymmetricCipher> = None;
    let mut outgoing_cipher: Option<AsymmetricCipher> = None;

    let (id, _) = read_frame(&mut server, &mut incoming_cipher).await?;
    anyhow::ensure!(id == out_ids.client_hello, "expected client_hello, got {id}");

    let (id, _) = read_frame(&mut server, &mut incoming_cipher).await?;
    anyhow::ensure!(id == out_ids.dh_init, "expected dh_init, got {id}");

    let p = BigUint::from(23u32);
    let g = BigUint::from(5u32);
    let p_block = rsa::pad_and_encrypt(&n, &e, p.to_string().as_bytes())?;
    let g_block = rsa::pad_and_encrypt(&n, &e, g.to_string().as_bytes())?;
    let mut server_dh_init = OutFrame::new(ids.server_dh_init);
    server_dh_init.write_string(&p_block).write_string(&g_block);
    write_frame(&mut server, &server_dh_init.finish(), &mut outgoing_cipher).await?;

    let (id, body) = read_frame(&mut server, &mut incoming_cipher).await?;
    anyhow::ensure!(id == out_ids.dh_complete, "expected dh_complete, got {id}");
    let a_block = InFrame::new(&body).read_string();
    let big_a = rsa::verify_and_unpad(&n, &e, &a_block)?;

    let b = BigUint::from(7u32);
    let big_b = g.modpow(&b, &p);
    let shared = big_a.modpow(&b, &p);
    let key_bytes = shared.to_bytes_be();
    anyhow::ensure!(!key_bytes.is_empty(), "derived an empty shared secret");

    let b_block = rsa::pad_and_encrypt(&n, &e, big_b.to_string().as_bytes())?;
    let mut server_dh_complete = OutFrame::new(ids.server_dh_complete);
    server_dh_complete.write_string(&b_block).write_bool(true); // bidirectional
    write_frame(&mut server, &server_dh_complete.finish(), &mut outgoing_cipher).await?;

    incoming_cipher = Some(AsymmetricCipher::new(&key_bytes));
    outgoing_cipher = Some(AsymmetricCipher::new(&key_bytes));

    let (id, _) = read_frame(&mut server, &mut incoming_cipher).await?;
    anyhow::ensure!(id == out_ids.version_check, "expected version_check, got {id}");
    let (id, _) = read_frame(&mut server, &mut incoming_cipher).await?;
    anyhow::ensure!(id == out_ids.unique_id, "expected unique_id, got {id}");
    let (id, body) = read_frame(&mut server, &mut incoming_cipher).await?;
    anyhow::ensure!(id == out_ids.sso_ticket, "expected sso_ticket, got {id}");
    let ticket = InFrame::new(&body).read_string();
    anyhow::ensure!(ticket == "test-ticket-xyz", "unexpected ticket: {ticket}");

    let auth_ok = OutFrame::new(ids.authentication_ok);
    write_frame(&mut server, &auth_ok.finish(), &mut outgoing_cipher).await?;

    let (id, _) = read_frame(&mut server, &mut incoming_cipher).await?;
    anyhow::ensure!(id == out_ids.info_retrieve, "expected info_retrieve, got {id}");

    Ok(())
}

#[tokio::test]
async fn full_handshake_against_a_scripted_server() -> Result<()> {
    let cfg = test_config();
    let (client_half, server_half) = tokio::io::duplex(16 * 1024);
    let mut client_stream: GameStream = Box::new(client_half);

    let statuses = Arc::new(Mutex::new(Vec::new()));
    let statuses_cb = Arc::clone(&statuses);
    let observers = Observers {
        on_status: Some(Arc::new(move |s| statuses_cb.lock().expect("lock").push(s))),
        ..Default::default()
    };
    let cancel = CancellationToken::new();

    let server_cfg = cfg.clone();
    let server_task =
        tokio::spawn(async move { run_fake_server(server_half, server_cfg).await });

    let outcome =
        run_handshake(&mut client_stream, &cfg, "test-ticket-xyz", &observers, &cancel).await?;

    server_task.await.map_err(|e| anyhow!("server task panicked: {e}"))??;

    assert!(outcome.outgoing_cipher.is_some());
    assert!(outcome.incoming_cipher.is_some(), "bidirectional flag was set by the fake server");

    let seen = statuses.lock().expect("lock");
    assert_eq!(
        seen.as_slice(),
        &[
            SessionStatus::PlaintextHandshake,
            SessionStatus::CipheredHandshake,
            SessionStatus::Authenticated,
        ]
    );

    Ok(())
}

#[tokio::test]
async fn handshake_surfaces_an_explicit_ban_sent_mid_exchange() -> Result<()> {
    let cfg = test_config();
    let (client_half, mut server_half) = tokio::io::duplex(16 * 1024);
    let mut client_stream: GameStream = Box::new(client_half);
    let observers = Observers::default();
    let cancel = CancellationToken::new();

    let ids = cfg.packet_ids.incoming.clone();
    let out_ids = cfg.packet_ids.outgoing.clone();
    let server_task = tokio::spawn(async move {
        let mut no_cipher = None;
        let (id, _) = read_frame(&mut server_half, &mut no_cipher).await?;
        anyhow::ensure!(id == out_ids.client_hello, "expected client_hello, got {id}");

        let mut ban = OutFrame::new(ids.explicit_ban);
        ban.write_string("account flagged for review");
        write_frame(&mut server_half, &ban.finish(), &mut no_cipher).await?;
        Ok::<(), anyhow::Error>(())
    });

    let result = run_handshake(&mut client_stream, &cfg, "ticket", &observers, &cancel).await;
    server_task.await.map_err(|e| anyhow!("server task panicked: {e}"))??;

    let err = result.expect_err("handshake should fail on an explicit ban");
    assert!(err.to_string().contains("account flagged for review"));

    Ok(())
}
