use aes::cipher::{BlockDecryptMut as _, BlockEncryptMut as _, KeyInit as _, KeyIvInit as _};
use crate::encodings;
use crate::object::Dictionary;
use crate::Error;
use crate::encryption::{EncryptionContext, Permissions};
use md5::{Digest as _, Md5};
use rand::Rng as _;
use sha2::{Sha256, Sha384, Sha512};
use super::DecryptionError;
use super::rc4::Rc4;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256EbcEnc = ecb::Encryptor<aes::Aes256>;

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Aes256EbcDec = ecb::Decryptor<aes::Aes256>;

// If the password string is less than 32 bytes long, pad it by appending the required number of
// additional bytes from the beginning of the following padding string.
const PAD_BYTES: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08, 0x2E, 0x2E, 0x00,
    0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

#[derive(Clone, Debug, Default)]
pub struct PasswordAlgorithm {
    pub(crate) encrypt_metadata: bool,
    pub(crate) length: Option<usize>,
    pub(crate) version: i64,
    pub(crate) revision: i64,
    pub(crate) owner_value: Vec<u8>,
    pub(crate) owner_encrypted: Vec<u8>,
    pub(crate) user_value: Vec<u8>,
    pub(crate) user_encrypted: Vec<u8>,
    pub(crate) permissions: Permissions,
    pub(crate) permission_encrypted: Vec<u8>,
}

impl TryFrom<&Dictionary> for PasswordAlgorithm {
    type Error = Error;

    fn try_from(encrypted: &Dictionary) -> Result<Self, Self::Error> {
        let encrypt_metadata = encrypted
            .get_opt(b"EncryptMetadata")
            .map(|v| v.as_bool())
            .transpose()
            .map_err(|_| Error::from(DecryptionError::InvalidType))?
            .unwrap_or(true);

        let length: Option<usize> = match encrypted.get(b"Length") {
            Ok(value) => Some(
                value
                    .as_i64()
                    .map_err(|_| DecryptionError::InvalidType)?
                    .try_into()
                    .map_err(|_| DecryptionError::InvalidKeyLength)?,
            ),
            Err(_) => None,
        };

        let version = encrypted
            .get(b"V")
            .map_err(|_| DecryptionError::MissingVersion)?
            .as_i64()
            .map_err(|_| DecryptionError::InvalidType)?;

        match version {
            0 => return Err(DecryptionError::InvalidVersion)?,
            1 => (),
            2 => (),
            3 => return Err(DecryptionError::InvalidVersion)?,
            4 => (),
            5 => (),
            _ => return Err(DecryptionError::UnsupportedVersion)?,
        }

        if let Some(length) = length {
            match version {
                1 => {
                    if length != 40 {
                        return Err(DecryptionError::InvalidKeyLength)?;
                    }
                }
                2..=3 => {
                    if length % 8 != 0 || !(40..=128).contains(&length) {
                        return Err(DecryptionError::InvalidKeyLength)?;
                    }
                }
                4 => {
                    if length != 128 {
                        return Err(DecryptionError::InvalidKeyLength)?;
                    }
                }
                5 => {
                    if length != 256 {
                        return Err(DecryptionError::InvalidKeyLength)?;
                    }
                }
                _ => return Err(DecryptionError::InvalidKeyLength)?,
            }
        }

        let revision = encrypted
            .get(b"R")
            .map_err(|_| DecryptionError::MissingRevision)?
            .as_i64()
            .map_err(|_| DecryptionError::InvalidType)?;

        let owner_value = encrypted
            .get(b"O")
            .map_err(|_| DecryptionError::MissingOwnerPassword)?
            .as_string_bytes()
            .map_err(|_| DecryptionError::InvalidType)?
            .to_vec();

        if revision <= 4 && owner_value.len() != 32 {
            return Err(DecryptionError::InvalidHashLength)?;
        }

        if revision >= 5 && owner_value.len() != 48 {
            return Err(DecryptionError::InvalidHashLength)?;
        }

        let owner_encrypted = encrypted
            .get(b"OE")
            .and_then(|v| v.as_string_bytes())
            .map(|s| s.to_vec())
            .ok()
            .unwrap_or_default();

        if revision >= 5 && owner_encrypted.len() != 32 {
            return Err(DecryptionError::InvalidCipherTextLength)?;
        }

        let user_value = encrypted
            .get(b"U")
            .map_err(|_| DecryptionError::MissingUserPassword)?
            .as_string_bytes()
            .map_err(|_| DecryptionError::InvalidType)?
            .to_vec();

        if revision <= 4 && user_value.len() != 32 {
            return Err(DecryptionError::InvalidHashLength)?;
        }

        if revision >= 5 && user_value.len() != 48 {
            return Err(DecryptionError::InvalidHashLength)?;
        }

        let user_encrypted = encrypted
            .get(b"UE")
            .and_then(|v| v.as_string_bytes())
            .map(|s| s.to_vec())
            .ok()
            .unwrap_or_default();

        if revision >= 5 && user_encrypted.len() != 32 {
            return Err(DecryptionError::InvalidCipherTextLength)?;
        }

        let permission_value = encrypted
            .get(b"P")
            .map_err(|_| DecryptionError::MissingPermissions)?
            .as_i64()
            .map_err(|_| DecryptionError::InvalidType)? as u64;

        let permissions = Permissions::from_bits_retain(permission_value);

        let permission_encrypted = encrypted
            .get(b"Perms")
            .and_then(|v| v.as_string_bytes())
            .map(|s| s.to_vec())
            .ok()
            .unwrap_or_default();

        if revision >= 5 && permission_encrypted.len() != 16 {
            return Err(DecryptionError::InvalidCipherTextLength)?;
        }

        Ok(Self {
            encrypt_metadata,
            length,
            version,
            revision,
            owner_value,
            owner_encrypted,
            user_value,
            user_encrypted,
            permissions,
            permission_encrypted,
        })
    }
}

impl PasswordAlgorithm {
    /// Sanitize the password (revision 4 and earlier). Implements the first step of
    /// Algorithm 2 in ISO 32000-2:2020.
    pub(crate) fn sanitize_password_r4(&self, password: &str) -> Result<Vec<u8>, DecryptionError> {
        Ok(encodings::string_to_bytes(&encodings::PDF_DOC_ENCODING, password))
    }

    /// Compute a file encryption key (revision 4 and earlier). Implements Algorithm 2.
    pub(crate) fn compute_file_encryption_key_r4<P>(
        &self,
        doc: &dyn EncryptionContext,
        password: P,
    ) -> Result<Vec<u8>, DecryptionError>
    where
        P: AsRef<[u8]>,
    {
        let password = password.as_ref();
        let len = password.len().min(32);

        let mut hasher = Md5::new();

        hasher.update(&password[..len]);
        hasher.update(&PAD_BYTES[..32 - len]);
        hasher.update(&self.owner_value);
        hasher.update((self.permissions.bits() as u32).to_le_bytes());

        let file_id_0 = doc
            .trailer()
            .get(b"ID")
            .map_err(|_| DecryptionError::MissingFileID)?
            .as_array()
            .map_err(|_| DecryptionError::InvalidType)?
            .first()
            .ok_or(DecryptionError::InvalidType)?
            .as_string_bytes()
            .map_err(|_| DecryptionError::InvalidType)?;
        hasher.update(file_id_0);

        if self.revision >= 4 && !self.encrypt_metadata {
            hasher.update(b"\xff\xff\xff\xff");
        }

        let mut hash = hasher.finalize();

        let n = if self.revision >= 3 { self.length.unwrap_or(40) / 8 } else { 5 };

        if n > 16 {
            return Err(DecryptionError::InvalidKeyLength);
        }

        if self.revision >= 3 {
            for _ in 0..50 {
                hash = Md5::digest(&hash[..n]);
            }
        }

        Ok(hash[..n].to_vec())
    }

    /// Sanitize the password (revision 6 and later). Implements the first step of
    /// Algorithm 2.A.
    pub(crate) fn sanitize_password_r6(&self, password: &str) -> Result<Vec<u8>, DecryptionError> {
        Ok(stringprep::saslprep(password)?.as_bytes().to_vec())
    }

    /// Compute a file encryption key (revision 6 and later). Implements Algorithm 2.A.
    fn compute_file_encryption_key_r6<P>(&self, password: P) -> Result<Vec<u8>, DecryptionError>
    where
        P: AsRef<[u8]>,
    {
        let mut password = password.as_ref();

        let hashed_owner_password = &self.owner_value[0..][..32];
        let owner_validation_salt = &self.owner_value[32..][..8];
        let owner_key_salt = &self.owner_value[40..][..8];

        let hashed_user_password = &self.user_value[0..][..32];
        let user_validation_salt = &self.user_value[32..][..8];
        let user_key_salt = &self.user_value[40..][..8];

        if password.len() > 127 {
            password = &password[..127];
        }

        if self.compute_hash(password, owner_validation_salt, Some(&self.user_value))? == hashed_owner_password {
            let hash = self.compute_hash(password, owner_key_salt, Some(&self.user_value))?;

            let mut key = [0u8; 32];
            key.copy_from_slice(&hash);

            let iv = [0u8; 16];

            let mut owner_encrypted = self.owner_encrypted.clone();
            let mut decryptor = Aes256CbcDec::new(&key.into(), &iv.into());

            for block in owner_encrypted.chunks_exact_mut(16) {
                decryptor.decrypt_block_mut(block.into());
            }

            return Ok(owner_encrypted);
        }

        if self.compute_hash(password, user_validation_salt, None)? == hashed_user_password {
            let hash = self.compute_hash(password, user_key_salt, None)?;

            let mut key = [0u8; 32];
            key.copy_from_slice(&hash);

            let iv = [0u8; 16];
            let mut user_encrypted = self.user_encrypted.clone();
            let mut decryptor = Aes256CbcDec::new(&key.into(), &iv.into());

            for block in user_encrypted.chunks_exact_mut(16) {
                decryptor.decrypt_block_mut(block.into());
            }

            self.validate_permissions(&user_encrypted)?;

            return Ok(user_encrypted);
        }

        Err(DecryptionError::IncorrectPassword)
    }

    /// Compute a hash (revision 6 and later). Implements Algorithm 2.B.
    fn compute_hash<P, S>(&self, password: P, salt: S, user_key: Option<&[u8]>) -> Result<Vec<u8>, DecryptionError>
    where
        P: AsRef<[u8]>,
        S: AsRef<[u8]>,
    {
        let password = password.as_ref();
        let salt = salt.as_ref();

        let mut hasher = Sha256::new();

        hasher.update(password);
        hasher.update(salt);

        if let Some(user_key) = user_key {
            hasher.update(user_key);
        }

        let mut k = hasher.finalize().to_vec();

        if self.revision == 5 {
            return Ok(k);
        }

        let mut k1 = Vec::with_capacity(64 * (password.len() + 64 + user_key.map(|u| u.len()).unwrap_or(0)));

        for round in 1.. {
            k1.clear();

            for _ in 0..64 {
                k1.extend_from_slice(password);
                k1.extend_from_slice(&k);

                if let Some(user_key) = user_key {
                    k1.extend_from_slice(user_key);
                }
            }

            let key = &k[0..][..16];
            let iv = &k[16..][..16];

            let mut encryptor = Aes128CbcEnc::new(key.into(), iv.into());

            for block in k1.chunks_exact_mut(16) {
                encryptor.encrypt_block_mut(block.into());
            }

            let e = k1;

            k = match e[..16].iter().map(|v| *v as u32).sum::<u32>() % 3 {
                0 => Sha256::digest(&e).to_vec(),
                1 => Sha384::digest(&e).to_vec(),
                2 => Sha512::digest(&e).to_vec(),
                _ => unreachable!(),
            };

            if round >= 64 && e.last().copied().unwrap_or(0) as u32 <= round - 32 {
                break;
            }

            k1 = e;
        }

        k.truncate(32);

        Ok(k)
    }

    /// Compute the O-entry value (revision 4 and earlier). Implements Algorithm 3.
    pub(crate) fn compute_hashed_owner_password_r4<O, U>(
        &self,
        owner_password: Option<O>,
        user_password: U,
    ) -> Result<Vec<u8>, DecryptionError>
    where
        O: AsRef<[u8]>,
        U: AsRef<[u8]>,
    {
        let user_password = user_password.as_ref();
        let password = owner_password.as_ref().map(|p| p.as_ref()).unwrap_or(user_password);

        let len = password.len().min(32);

        let mut hasher = Md5::new();

        hasher.update(&password[..len]);
        hasher.update(&PAD_BYTES[..32 - len]);

        let mut hash = hasher.finalize();

        if self.revision >= 3 {
            for _ in 0..50 {
                hash = Md5::digest(hash);
            }
        }

        let n = if self.revision >= 3 { self.length.unwrap_or(40) / 8 } else { 5 };

        if n > 16 {
            return Err(DecryptionError::InvalidKeyLength);
        }

        let len = user_password.len().min(32);

        let mut bytes = [0u8; 32];

        bytes[..len].copy_from_slice(&user_password[..len]);
        bytes[len..].copy_from_slice(&PAD_BYTES[..32 - len]);

        let mut result = Rc4::new(&hash[..n]).encrypt(bytes);

        if self.revision >= 3 {
            let mut key = vec![0u8; n];

            for i in 1..=19 {
                for (in_byte, out_byte) in hash[..n].iter().zip(key.iter_mut()) {
                    *out_byte = in_byte ^ i;
                }

                result = Rc4::new(&key).encrypt(&result);
            }
        }

        Ok(result)
    }

    /// Compute the U-entry value (revision 2). Implements Algorithm 4.
    pub(crate) fn compute_hashed_user_password_r2<U>(
        &self,
        doc: &dyn EncryptionContext,
        user_password: U,
    ) -> Result<Vec<u8>, DecryptionError>
    where
        U: AsRef<[u8]>,
    {
        let file_encryption_key = self.compute_file_encryption_key_r4(doc, user_password)?;
        let result = Rc4::new(&file_encryption_key).encrypt(PAD_BYTES);

        Ok(result)
    }

    /// Compute the U-entry value (revision 3 or 4). Implements Algorithm 5.
    pub(crate) fn compute_hashed_user_password_r3_r4<U>(
        &self,
        doc: &dyn EncryptionContext,
        user_password: U,
    ) -> Result<Vec<u8>, DecryptionError>
    where
        U: AsRef<[u8]>,
    {
        let file_encryption_key = self.compute_file_encryption_key_r4(doc, user_password)?;

        let mut hasher = Md5::new();

        hasher.update(PAD_BYTES);

        let file_id_0 = doc
            .trailer()
            .get(b"ID")
            .map_err(|_| DecryptionError::MissingFileID)?
            .as_array()
            .map_err(|_| DecryptionError::InvalidType)?
            .first()
            .ok_or(DecryptionError::InvalidType)?
            .as_string_bytes()
            .map_err(|_| DecryptionError::InvalidType)?;
        hasher.update(file_id_0);

        let hash = hasher.finalize();

        let mut result = Rc4::new(&file_encryption_key).encrypt(hash);

        let mut key = vec![0u8; file_encryption_key.len()];

        for i in 1..=19 {
            for (in_byte, out_byte) in file_encryption_key.iter().zip(key.iter_mut()) {
                *out_byte = in_byte ^ i;
            }

            result = Rc4::new(&key).encrypt(&result);
        }

        result.resize(32, 0);

        let mut rng = rand::rng();
        rng.fill(&mut result[16..]);

        Ok(result)
    }

    /// Authenticate the user password (revision 4 and earlier). Implements Algorithm 6.
    fn authenticate_user_password_r4<U>(&self, doc: &dyn EncryptionContext, user_password: U) -> Result<(), DecryptionError>
    where
        U: AsRef<[u8]>,
    {
        let hashed_user_password = match self.revision {
            2 => self.compute_hashed_user_password_r2(doc, &user_password)?,
            3 | 4 => self.compute_hashed_user_password_r3_r4(doc, &user_password)?,
            _ => return Err(DecryptionError::InvalidRevision),
        };

        let len = match self.revision {
            3 | 4 => 16,
            _ => hashed_user_password.len(),
        };

        if self.user_value.len() < len {
            return Err(DecryptionError::InvalidHashLength);
        }

        if hashed_user_password[..len] != self.user_value[..len] {
            return Err(DecryptionError::IncorrectPassword);
        }

        Ok(())
    }

    /// Authenticate the owner password (revision 4 and earlier). Implements Algorithm 7.
    fn authenticate_owner_password_r4<O>(&self, doc: &dyn EncryptionContext, owner_password: O) -> Result<(), DecryptionError>
    where
        O: AsRef<[u8]>,
    {
        let password = owner_password.as_ref();

        let len = password.len().min(32);

        let mut hasher = Md5::new();

        hasher.update(&password[..len]);
        hasher.update(&PAD_BYTES[..32 - len]);

        let mut hash = hasher.finalize();

        if self.revision >= 3 {
            for _ in 0..50 {
                hash = Md5::digest(hash);
            }
        }

        let n = if self.revision >= 3 { self.length.unwrap_or(40) / 8 } else { 5 };

        if n > 16 {
            return Err(DecryptionError::InvalidKeyLength);
        }

        let mut result = self.owner_value.to_vec();

        if self.revision >= 3 {
            let mut key = vec![0u8; n];

            for i in (1..=19).rev() {
                for (in_byte, out_byte) in hash[..n].iter().zip(key.iter_mut()) {
                    *out_byte = in_byte ^ i;
                }

                result = Rc4::new(&key).decrypt(&result);
            }
        }

        result = Rc4::new(&hash[..n]).decrypt(&result);

        self.authenticate_user_password_r4(doc, &result)
    }

    /// Compute the U-entry value (revision 6). Implements Algorithm 8.
    pub(crate) fn compute_hashed_user_password_r6<K, U>(
        &self,
        file_encryption_key: K,
        user_password: U,
    ) -> Result<(Vec<u8>, Vec<u8>), DecryptionError>
    where
        K: AsRef<[u8]>,
        U: AsRef<[u8]>,
    {
        let file_encryption_key = file_encryption_key.as_ref();
        let user_password = user_password.as_ref();

        let mut user_value = [0u8; 48];
        let mut rng = rand::rng();

        rng.fill(&mut user_value[32..]);

        let user_validation_salt = &user_value[32..][..8];

        let hashed_user_password = self.compute_hash(user_password, user_validation_salt, None)?;
        user_value[..32].copy_from_slice(&hashed_user_password);

        let user_key_salt = &user_value[40..][..8];

        let hash = self.compute_hash(user_password, user_key_salt, None)?;

        let mut key = [0u8; 32];
        key.copy_from_slice(&hash);

        let iv = [0u8; 16];

        let mut user_encrypted = file_encryption_key.to_vec();
        let mut encryptor = Aes256CbcEnc::new(&key.into(), &iv.into());

        for block in user_encrypted.chunks_exact_mut(16) {
            encryptor.encrypt_block_mut(block.into());
        }

        Ok((user_value.to_vec(), user_encrypted))
    }

    /// Compute the O-entry value (revision 6). Implements Algorithm 9.
    pub(crate) fn compute_hashed_owner_password_r6<K, O>(
        &self,
        file_encryption_key: K,
        owner_password: O,
    ) -> Result<(Vec<u8>, Vec<u8>), DecryptionError>
    where
        K: AsRef<[u8]>,
        O: AsRef<[u8]>,
    {
        let file_encryption_key = file_encryption_key.as_ref();
        let owner_password = owner_password.as_ref();

        let mut owner_value = [0u8; 48];
        let mut rng = rand::rng();

        rng.fill(&mut owner_value[32..]);

        let owner_validation_salt = &owner_value[32..][..8];

        let hashed_owner_password = self.compute_hash(owner_password, owner_validation_salt, Some(&self.user_value))?;
        owner_value[..32].copy_from_slice(&hashed_owner_password);

        let owner_key_salt = &owner_value[40..][..8];

        let hash = self.compute_hash(owner_password, owner_key_salt, Some(&self.user_value))?;

        let mut key = [0u8; 32];
        key.copy_from_slice(&hash);

        let iv = [0u8; 16];

        let mut owner_encrypted = file_encryption_key.to_vec();
        let mut encryptor = Aes256CbcEnc::new(&key.into(), &iv.into());

        for block in owner_encrypted.chunks_exact_mut(16) {
            encryptor.encrypt_block_mut(block.into());
        }

        Ok((owner_value.to_vec(), owner_encrypted))
    }

    /// Compute the Perms (permissions) value (revision 6 and later). Implements Algorithm 10.
    pub(crate) fn compute_permissions<K>(&self, file_encryption_key: K) -> Result<Vec<u8>, DecryptionError>
    where
        K: AsRef<[u8]>,
    {
        let file_encryption_key = file_encryption_key.as_ref();
        let mut bytes = [0u8; 16];

        bytes[..8].copy_from_slice(&u64::to_le_bytes(self.permissions.bits()));
        bytes[8] = if self.encrypt_metadata { b'T' } else { b'F' };
        bytes[9..][..3].copy_from_slice(b"adb");

        let mut rng = rand::rng();
        rng.fill(&mut bytes[12..][..4]);

        let mut key = [0u8; 32];
        key.copy_from_slice(file_encryption_key);

        let mut encryptor = Aes256EbcEnc::new(&key.into());

        for block in bytes.chunks_exact_mut(16) {
            encryptor.encrypt_block_mut(block.into());
        }

        Ok(bytes.to_vec())
    }

    /// Authenticate the user password (revision 6 and later). Implements Algorithm 11.
    fn authenticate_user_password_r6<U>(&self, user_password: U) -> Result<(), DecryptionError>
    where
        U: AsRef<[u8]>,
    {
        let mut user_password = user_password.as_ref();

        let hashed_user_password = &self.user_value[0..][..32];
        let user_validation_salt = &self.user_value[32..][..8];

        if user_password.len() > 127 {
            user_password = &user_password[..127];
        }

        if self.compute_hash(user_password, user_validation_salt, None)? != hashed_user_password {
            return Err(DecryptionError::IncorrectPassword);
        }

        Ok(())
    }

    /// Authenticate the owner password (revision 6 and later). Implements Algorithm 12.
    fn authenticate_owner_password_r6<O>(&self, owner_password: O) -> Result<(), DecryptionError>
    where
        O: AsRef<[u8]>,
    {
        let mut owner_password = owner_password.as_ref();

        let hashed_owner_password = &self.owner_value[0..][..32];
        let owner_validation_salt = &self.owner_value[32..][..8];

        if owner_password.len() > 127 {
            owner_password = &owner_password[..127];
        }

        if self.compute_hash(owner_password, owner_validation_salt, Some(&self.user_value))? != hashed_owner_password {
            return Err(DecryptionError::IncorrectPassword);
        }

        Ok(())
    }

    /// Validate the permissions (revision 6 and later). Implements Algorithm 13.
    fn validate_permissions<K>(&self, file_encryption_key: K) -> Result<(), DecryptionError>
    where
        K: AsRef<[u8]>,
    {
        let file_encryption_key = file_encryption_key.as_ref();

        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&self.permission_encrypted);

        let mut key = [0u8; 32];
        key.copy_from_slice(file_encryption_key);

        let mut decryptor = Aes256EbcDec::new(&key.into());

        for block in bytes.chunks_exact_mut(16) {
            decryptor.decrypt_block_mut(block.into());
        }

        if &bytes[9..][..3] != b"adb" {
            return Err(DecryptionError::IncorrectPassword);
        }

        if bytes[..3] != u64::to_le_bytes(self.permissions.bits())[..3] {
            return Err(DecryptionError::IncorrectPassword);
        }

        if bytes[8] != if self.encrypt_metadata { b'T' } else { b'F' } {
            return Err(DecryptionError::IncorrectPassword);
        }

        Ok(())
    }

    pub fn sanitize_password(&self, password: &str) -> Result<Vec<u8>, DecryptionError> {
        match self.revision {
            2..=4 => self.sanitize_password_r4(password),
            5..=6 => self.sanitize_password_r6(password),
            _ => Err(DecryptionError::UnsupportedRevision),
        }
    }

    pub fn compute_file_encryption_key<P>(&self, doc: &dyn EncryptionContext, password: P) -> Result<Vec<u8>, DecryptionError>
    where
        P: AsRef<[u8]>,
    {
        match self.revision {
            2..=4 => self.compute_file_encryption_key_r4(doc, password),
            5..=6 => self.compute_file_encryption_key_r6(password),
            _ => Err(DecryptionError::UnsupportedRevision),
        }
    }

    pub fn authenticate_user_password<U>(&self, doc: &dyn EncryptionContext, user_password: U) -> Result<(), DecryptionError>
    where
        U: AsRef<[u8]>,
    {
        match self.revision {
            2..=4 => self.authenticate_user_password_r4(doc, user_password),
            5..=6 => self.authenticate_user_password_r6(user_password),
            _ => Err(DecryptionError::UnsupportedRevision),
        }
    }

    pub fn authenticate_owner_password<O>(&self, doc: &dyn EncryptionContext, owner_password: O) -> Result<(), DecryptionError>
    where
        O: AsRef<[u8]>,
    {
        match self.revision {
            2..=4 => self.authenticate_owner_password_r4(doc, owner_password),
            5..=6 => self.authenticate_owner_password_r6(owner_password),
            _ => Err(DecryptionError::UnsupportedRevision),
        }
    }
}
