//! Shared fixture for the settlement integration tests.

#![allow(dead_code)]

use std::sync::Once;

use consideration_conduit::ConduitController;
use consideration_ledger::Ledger;
use consideration_settlement::{Marketplace, TransferHelper};
use consideration_types::{Address, ConduitKey, EngineConfig, ItemType};
use rust_decimal::Decimal;

static INIT: Once = Once::new();

/// Route test logs through the libtest capture. Set `RUST_LOG` to see them.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn d(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

/// One ledger, one conduit registry, and both entry points, with a token of
/// each kind deployed.
pub struct Env {
    pub ledger: Ledger,
    pub conduits: ConduitController,
    pub helper: TransferHelper,
    pub marketplace: Marketplace,
    pub usdc: Address,
    pub nft: Address,
    pub game: Address,
}

impl Env {
    pub fn new() -> Self {
        init_tracing();
        let config = EngineConfig::default();
        let mut ledger = Ledger::new();
        let usdc = ledger.deploy_token(ItemType::Erc20).unwrap();
        let nft = ledger.deploy_token(ItemType::Erc721).unwrap();
        let game = ledger.deploy_token(ItemType::Erc1155).unwrap();
        Self {
            ledger,
            conduits: ConduitController::from_config(&config.conduit_controller),
            helper: TransferHelper::from_config(&config.transfer_helper),
            marketplace: Marketplace::from_config(&config.marketplace),
            usdc,
            nft,
            game,
        }
    }

    /// Give `owner` blanket approval for `operator` on every deployed token.
    pub fn approve_all(&mut self, owner: Address, operator: Address) {
        self.ledger
            .approve(self.usdc, owner, operator, Decimal::MAX)
            .unwrap();
        self.ledger
            .set_approval_for_all(self.nft, owner, operator, true)
            .unwrap();
        self.ledger
            .set_approval_for_all(self.game, owner, operator, true)
            .unwrap();
    }

    /// Create a standard conduit owned by `owner` with `channel` open, and
    /// approve it for all of `owner`'s tokens.
    pub fn open_conduit(&mut self, owner: Address, salt: u8, channel: Address) -> (ConduitKey, Address) {
        let key = ConduitKey::new(owner, [salt; 12]);
        let conduit = self.conduits.create_conduit(owner, key, owner).unwrap();
        self.conduits
            .update_channel(owner, conduit, channel, true)
            .unwrap();
        self.approve_all(owner, conduit);
        (key, conduit)
    }
}
