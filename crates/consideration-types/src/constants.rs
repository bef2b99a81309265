//! System-wide constants for the Consideration settlement engine.

/// Magic value a conduit returns after executing a full batch of transfers.
pub const CONDUIT_EXECUTE_MAGIC: [u8; 4] = [0x4c, 0xe3, 0x4a, 0xa2];

/// Magic value returned by the transfer helper on a successful bulk transfer.
pub const TRANSFER_HELPER_MAGIC: [u8; 4] = [0x0e, 0x7f, 0x3f, 0x26];

/// Magic value an ERC721 receiver hook must return to accept a token.
pub const ERC721_RECEIVED_MAGIC: [u8; 4] = [0x15, 0x0b, 0x7a, 0x02];

/// Selector prefixing `Error(string)` revert data.
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Selector prefixing `Panic(uint256)` revert data.
pub const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// Panic code raised on arithmetic overflow / underflow.
pub const PANIC_ARITHMETIC: u64 = 0x11;

/// Panic code raised on division by zero.
pub const PANIC_DIVISION_BY_ZERO: u64 = 0x12;

/// Reason reported when an ERC721 receiver hook returns the wrong magic value.
pub const NON_RECEIVER_REASON: &str = "ERC721: transfer to non ERC721Receiver implementer";

/// Domain separator for label-derived addresses.
pub const ADDRESS_DOMAIN: &[u8] = b"consideration:address:v1:";

/// Domain separator for addresses derived from ed25519 public keys.
pub const PUBKEY_DOMAIN: &[u8] = b"consideration:pubkey:v1:";

/// Domain separator for conduit address derivation.
pub const CONDUIT_DOMAIN: &[u8] = b"consideration:conduit:v1:";

/// Domain separator for token contract deployment addresses.
pub const DEPLOY_DOMAIN: &[u8] = b"consideration:deploy:v1:";

/// Domain separator for order hashes.
pub const ORDER_DOMAIN: &[u8] = b"consideration:order:v1:";

/// Label used to derive the default marketplace address.
pub const DEFAULT_MARKETPLACE_LABEL: &str = "consideration";

/// Label used to derive the default transfer helper address.
pub const DEFAULT_TRANSFER_HELPER_LABEL: &str = "transfer-helper";

/// Label used to derive the default conduit controller address.
pub const DEFAULT_CONDUIT_CONTROLLER_LABEL: &str = "conduit-controller";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Consideration";
