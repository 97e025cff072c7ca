//! Passwort-Hashing mit Argon2id
//!
//! Produktions-Implementierung des `PasswortHasher`-Seams. Argon2id ist
//! der empfohlene Algorithmus gemaess OWASP-Richtlinien; der Router ruft
//! beide Methoden ausschliesslich auf dem Blocking-Pool auf.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, Version,
};

use plauderei_signaling::{HashFehler, PasswortHasher as HasherSeam};

/// Argon2id-Parameter fuer Kanal-Passwoerter
///
/// Werte gemaess OWASP-Empfehlungen (Stand 2024):
/// - Speicher: 64 MiB
/// - Iterationen: 3
/// - Parallelismus: 1
fn argon2_instanz() -> Result<Argon2<'static>, HashFehler> {
    let params = Params::new(
        64 * 1024, // m_cost: 64 MiB
        3,         // t_cost: 3 Iterationen
        1,         // p_cost: 1 Thread
        None,      // output_len: Standard (32 Bytes)
    )
    .map_err(|e| HashFehler(e.to_string()))?;

    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

/// Hasht und verifiziert Kanal-Passwoerter mit Argon2id
pub struct Argon2Hasher;

impl HasherSeam for Argon2Hasher {
    /// Hasht ein Passwort mit zufaelligem Salt zum PHC-String
    fn hashen(&self, klartext: &str) -> Result<String, HashFehler> {
        let salt = SaltString::generate(&mut OsRng);
        argon2_instanz()?
            .hash_password(klartext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashFehler(e.to_string()))
    }

    /// Verifiziert ein Passwort gegen einen gespeicherten PHC-Hash
    fn verifizieren(&self, klartext: &str, hash: &str) -> Result<bool, HashFehler> {
        let geparst = PasswordHash::new(hash)
            .map_err(|e| HashFehler(format!("Ungueltiges Hash-Format: {e}")))?;

        match argon2_instanz()?.verify_password(klartext.as_bytes(), &geparst) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(HashFehler(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passwort_hashen_und_verifizieren() {
        let hasher = Argon2Hasher;
        let hash = hasher.hashen("sicheres_passwort_123!").expect("Hashing fehlgeschlagen");

        assert!(
            hash.starts_with("$argon2id$"),
            "Hash muss mit $argon2id$ beginnen"
        );
        assert!(hasher
            .verifizieren("sicheres_passwort_123!", &hash)
            .expect("Verifikation fehlgeschlagen"));
    }

    #[test]
    fn falsches_passwort_wird_abgelehnt() {
        let hasher = Argon2Hasher;
        let hash = hasher.hashen("richtiges_passwort").expect("Hashing fehlgeschlagen");

        let korrekt = hasher
            .verifizieren("falsches_passwort", &hash)
            .expect("Verifikation fehlgeschlagen");
        assert!(!korrekt, "Falsches Passwort muss abgelehnt werden");
    }

    #[test]
    fn gleiche_passwoerter_unterschiedliche_hashes() {
        let hasher = Argon2Hasher;
        let hash1 = hasher.hashen("gleiches_passwort").unwrap();
        let hash2 = hasher.hashen("gleiches_passwort").unwrap();
        assert_ne!(
            hash1, hash2,
            "Gleiche Passwoerter muessen verschiedene Hashes erzeugen (Salt)"
        );
    }

    #[test]
    fn ungueltiges_hash_format_gibt_fehler() {
        let hasher = Argon2Hasher;
        assert!(hasher.verifizieren("passwort", "kein_gueltiger_hash").is_err());
    }
}
