use web_sys::{Storage, window};

use crate::game::config::StorageKeys;
use crate::game::error::GameError;
use crate::game::unlocks::{UnlockState, UnlockStore};

/// `UnlockStore` over `window.localStorage`. Flags are stored as `"1"`.
pub struct LocalStorageStore {
    keys: StorageKeys,
}

impl LocalStorageStore {
    pub fn new(keys: StorageKeys) -> Self {
        Self { keys }
    }

    fn storage() -> Result<Storage, GameError> {
        window()
            .ok_or_else(|| GameError::Storage("no window".into()))?
            .local_storage()
            .map_err(|e| GameError::Storage(format!("{e:?}")))?
            .ok_or_else(|| GameError::Storage("localStorage unavailable".into()))
    }

    fn get(storage: &Storage, key: &str) -> Result<Option<String>, GameError> {
        storage.get_item(key).map_err(|e| GameError::Storage(format!("{e:?}")))
    }

    fn set(storage: &Storage, key: &str, value: &str) -> Result<(), GameError> {
        storage.set_item(key, value).map_err(|e| GameError::Storage(format!("{e:?}")))
    }
}

impl UnlockStore for LocalStorageStore {
    fn load(&mut self) -> Result<UnlockState, GameError> {
        let s = Self::storage()?;
        let flag = |key: &str| -> Result<bool, GameError> { Ok(Self::get(&s, key)?.as_deref() == Some("1")) };
        Ok(UnlockState {
            high_score: Self::get(&s, &self.keys.high_score)?
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            infinite: flag(&self.keys.infinite)?,
            soundwave: flag(&self.keys.soundwave)?,
            sticky: flag(&self.keys.sticky)?,
        })
    }

    fn save(&mut self, state: &UnlockState) -> Result<(), GameError> {
        let s = Self::storage()?;
        Self::set(&s, &self.keys.high_score, &state.high_score.to_string())?;
        for (on, key) in [
            (state.infinite, &self.keys.infinite),
            (state.soundwave, &self.keys.soundwave),
            (state.sticky, &self.keys.sticky),
        ] {
            if on {
                Self::set(&s, key, "1")?;
            }
        }
        Ok(())
    }
}
