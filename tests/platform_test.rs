//! End-to-end platform flows across bids, settlement and the wallet ledger.

use ankpool::games::types::window_start;
use ankpool::games::SettlementOutcome;
use ankpool::{Platform, PlatformConfig, Role, TransactionKind, WalletKind};
use chrono::{Duration, Utc};
use std::sync::Arc;

fn platform() -> Platform {
    Platform::new(PlatformConfig::default())
}

#[test]
fn test_end_to_end_declared_winner_flow() {
    let platform = platform();
    let admin = platform.users.register("Admin", Role::Admin, None).unwrap();
    let user = platform.users.register("Player", Role::User, None).unwrap();

    platform.commission.current_or_seed();
    platform
        .wallets
        .recharge(admin.id, user.id, 500, WalletKind::Main, None)
        .unwrap();

    let game = platform
        .games
        .create_game(window_start(Utc::now(), 30))
        .unwrap();
    platform.bids.place_bid(user.id, game.id, 5, 100).unwrap();
    assert_eq!(platform.games.game(game.id).unwrap().total_pool, 100);

    let report = platform.settlement.declare_winner(admin.id, game.id, 5).unwrap();

    // Default 5/80/15 split of a 100 pool
    assert_eq!(report.commission.winner_payout, 80);
    assert_eq!(report.winner_count, 1);
    assert_eq!(report.payout_per_winner, 80);

    // 500 - 100 stake + 80 payout
    assert_eq!(platform.ledger.wallet(user.id).main, 480);

    let settled = platform.games.game(game.id).unwrap();
    assert_eq!(settled.result_number, Some(5));
    assert!(!settled.is_open());

    // The payout is journaled as a bonus credit naming the game
    let txns = platform.ledger.transactions_for(user.id, 10);
    let payout = txns
        .iter()
        .find(|t| t.kind == TransactionKind::Bonus)
        .expect("payout transaction missing");
    assert_eq!(payout.amount, 80);
    assert!(payout
        .note
        .as_deref()
        .unwrap()
        .contains(&game.id.to_string()));
}

#[test]
fn test_sweep_settles_due_game_with_unique_bid() {
    let platform = platform();
    let admin = platform.users.register("Admin", Role::Admin, None).unwrap();
    let (u1, u2, u3) = (
        platform.users.register("One", Role::User, None).unwrap(),
        platform.users.register("Two", Role::User, None).unwrap(),
        platform.users.register("Three", Role::User, None).unwrap(),
    );
    for user in [&u1, &u2, &u3] {
        platform
            .wallets
            .recharge(admin.id, user.id, 500, WalletKind::Main, None)
            .unwrap();
    }

    let game = platform
        .games
        .create_game(window_start(Utc::now(), 30))
        .unwrap();
    // Number 1 contested, number 4 unique and affordable
    platform.bids.place_bid(u1.id, game.id, 1, 100).unwrap();
    platform.bids.place_bid(u2.id, game.id, 1, 100).unwrap();
    platform.bids.place_bid(u3.id, game.id, 4, 50).unwrap();

    let after_delay = Utc::now() + Duration::minutes(26);
    let outcomes = platform.settlement.settle_due(after_delay);
    assert_eq!(outcomes.len(), 1);
    match &outcomes[0] {
        SettlementOutcome::AutoWinner {
            winner_number,
            payout,
            ..
        } => {
            assert_eq!(*winner_number, 4);
            assert_eq!(payout.user, u3.id);
            assert_eq!(payout.amount, 100);
        }
        other => panic!("expected auto winner, got {:?}", other),
    }

    // Losers keep their debits, the winner nets plus 50
    assert_eq!(platform.ledger.wallet(u1.id).main, 400);
    assert_eq!(platform.ledger.wallet(u2.id).main, 400);
    assert_eq!(platform.ledger.wallet(u3.id).main, 550);

    // A repeated sweep is a no-op
    assert!(platform.settlement.settle_due(after_delay).is_empty());
}

#[test]
fn test_recorded_override_applied_by_sweep() {
    let platform = platform();
    let admin = platform.users.register("Admin", Role::Admin, None).unwrap();
    let user = platform.users.register("Player", Role::User, None).unwrap();
    platform
        .wallets
        .recharge(admin.id, user.id, 500, WalletKind::Main, None)
        .unwrap();

    let game = platform
        .games
        .create_game(window_start(Utc::now(), 30))
        .unwrap();
    platform.bids.place_bid(user.id, game.id, 9, 50).unwrap();

    platform
        .settlement
        .record_override(admin.id, game.id, 9, vec![user.id], None, Some(3))
        .unwrap();

    let outcomes = platform
        .settlement
        .settle_due(Utc::now() + Duration::minutes(26));
    assert_eq!(outcomes.len(), 1);
    match &outcomes[0] {
        SettlementOutcome::OverrideApplied { payouts, .. } => {
            assert_eq!(payouts.len(), 1);
            assert_eq!(payouts[0].amount, 150);
        }
        other => panic!("expected override, got {:?}", other),
    }

    // 500 - 50 stake + 150 payout, commission split never touched
    assert_eq!(platform.ledger.wallet(user.id).main, 600);
}

#[test]
fn test_declaration_and_sweep_settle_exactly_once() {
    let platform = platform();
    let admin = platform.users.register("Admin", Role::Admin, None).unwrap();
    let user = platform.users.register("Player", Role::User, None).unwrap();
    platform.commission.current_or_seed();
    platform
        .wallets
        .recharge(admin.id, user.id, 500, WalletKind::Main, None)
        .unwrap();

    let game = platform
        .games
        .create_game(window_start(Utc::now(), 30))
        .unwrap();
    platform.bids.place_bid(user.id, game.id, 5, 100).unwrap();

    platform.settlement.declare_winner(admin.id, game.id, 5).unwrap();
    let balance = platform.ledger.wallet(user.id).main;

    // The sweep arrives later and must not double-pay
    let outcomes = platform
        .settlement
        .settle_due(Utc::now() + Duration::minutes(26));
    assert!(outcomes.is_empty());
    assert_eq!(platform.ledger.wallet(user.id).main, balance);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_bids_keep_pool_and_wallet_consistent() {
    let platform = Arc::new(Platform::new(PlatformConfig::default()));
    let admin = platform.users.register("Admin", Role::Admin, None).unwrap();
    let user = platform.users.register("Player", Role::User, None).unwrap();
    platform
        .wallets
        .recharge(admin.id, user.id, 1000, WalletKind::Main, None)
        .unwrap();

    let game = platform
        .games
        .create_game(window_start(Utc::now(), 30))
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..20u8 {
        let platform = Arc::clone(&platform);
        let user_id = user.id;
        let game_id = game.id;
        handles.push(tokio::spawn(async move {
            platform
                .bids
                .place_bid(user_id, game_id, (i % 12) + 1, 100)
                .is_ok()
        }));
    }

    let mut accepted = 0u64;
    for handle in handles {
        if handle.await.unwrap() {
            accepted += 1;
        }
    }

    // A 1000 balance covers exactly ten 100-unit bids; the pool must match
    // the accepted stakes and the wallet must end at zero, never negative.
    assert_eq!(accepted, 10);
    assert_eq!(platform.games.game(game.id).unwrap().total_pool, 1000);
    assert_eq!(platform.ledger.wallet(user.id).main, 0);
    assert_eq!(platform.games.bids_for_game(game.id).len(), 10);
}

#[test]
fn test_withdrawal_cycle_through_platform() {
    let platform = platform();
    let admin = platform.users.register("Admin", Role::Admin, None).unwrap();
    let user = platform.users.register("Player", Role::User, None).unwrap();
    platform
        .wallets
        .recharge(admin.id, user.id, 800, WalletKind::Main, None)
        .unwrap();

    let withdrawal = platform
        .withdrawals
        .request(user.id, 300, WalletKind::Main, None)
        .unwrap();
    assert_eq!(platform.ledger.wallet(user.id).main, 500);

    platform.withdrawals.reject(admin.id, withdrawal.id).unwrap();
    assert_eq!(platform.ledger.wallet(user.id).main, 800);

    // Ledger journal carries recharge, debit and refund entries
    let kinds: Vec<TransactionKind> = platform
        .ledger
        .transactions_for(user.id, 10)
        .iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TransactionKind::Refund,
            TransactionKind::Debit,
            TransactionKind::Recharge
        ]
    );
}
