//! Deterministic test keys, addresses and transaction fixtures

use emulator_common::{
    crypto::{blake2b_256, ed25519::SecretKey},
    Address, Credential, Hash, KeyHash, Lovelace, NetworkId, StakeAddress, Transaction,
    TransactionBody, TxOutput, UTxOIdentifier, Value, Voter,
};

/// A named wallet whose keys are derived from its name
#[derive(Clone)]
pub struct TestWallet {
    pub name: String,
    payment: SecretKey,
    stake: SecretKey,
}

impl TestWallet {
    pub fn new(name: &str) -> Self {
        let seed = |role: &str| blake2b_256(format!("{name}/{role}").as_bytes()).into_inner();
        Self {
            name: name.to_string(),
            payment: SecretKey::from_seed(seed("payment")),
            stake: SecretKey::from_seed(seed("stake")),
        }
    }

    pub fn payment_key(&self) -> &SecretKey {
        &self.payment
    }

    pub fn stake_key(&self) -> &SecretKey {
        &self.stake
    }

    pub fn key_hash(&self) -> KeyHash {
        self.payment.public_key().hash()
    }

    pub fn stake_key_hash(&self) -> KeyHash {
        self.stake.public_key().hash()
    }

    pub fn credential(&self) -> Credential {
        Credential::AddrKeyHash(self.key_hash())
    }

    /// Also used as the wallet's DRep credential
    pub fn stake_credential(&self) -> Credential {
        Credential::AddrKeyHash(self.stake_key_hash())
    }

    /// Base address: payment key plus stake key
    pub fn address(&self) -> Address {
        Address::new(NetworkId::Testnet, self.credential(), Some(self.stake_credential()))
    }

    pub fn stake_address(&self) -> StakeAddress {
        StakeAddress::new(self.stake_credential(), NetworkId::Testnet)
    }

    pub fn drep_voter(&self) -> Voter {
        Voter::DRepKey(self.stake_key_hash())
    }
}

pub fn hash28(b: u8) -> Hash<28> {
    Hash::new([b; 28])
}

pub fn hash32(b: u8) -> Hash<32> {
    Hash::new([b; 32])
}

/// Output reference with a synthetic transaction id
pub fn utxo_id(b: u8, index: u64) -> UTxOIdentifier {
    UTxOIdentifier::new(hash32(b), index)
}

pub fn ada_output(address: Address, lovelace: Lovelace) -> TxOutput {
    TxOutput::new(address, Value::lovelace(lovelace))
}

/// Transaction over `body` signed by every key given, in order
pub fn signed(body: TransactionBody, keys: &[&SecretKey]) -> Transaction {
    let mut tx = Transaction::new(body);
    for key in keys {
        tx.sign(key);
    }
    tx
}

/// Body spending `input` worth `available` into `outputs`, with the rest of the value,
/// after `fee`, returned to `change`
pub fn transfer(
    input: UTxOIdentifier,
    available: Lovelace,
    outputs: Vec<TxOutput>,
    change: &Address,
    fee: Lovelace,
) -> TransactionBody {
    let spent: Lovelace = outputs.iter().map(|o| o.value.coin()).sum::<Lovelace>() + fee;
    let mut outputs = outputs;
    outputs.push(ada_output(change.clone(), available - spent));
    TransactionBody {
        inputs: [input].into(),
        outputs,
        fee,
        ..TransactionBody::default()
    }
}
