use super::keypair::KeyPair;
use crate::context::RequestContext;
use crate::core::Result;
use std::ops::Index;
use tracing::{Instrument, Level, event, info_span};

/// Ordered key pairs owned by one user, in store order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPairList {
    objects: Vec<KeyPair>,
}

impl KeyPairList {
    /// Fetches every live key pair owned by `user_id` in one store call.
    pub async fn get_by_user(ctx: &RequestContext, user_id: &str) -> Result<Self> {
        let span = info_span!("keypair_list.get_by_user", mode = %ctx.mode(), user_id = %user_id);
        async move {
            let rows = ctx
                .store()
                .key_pair_get_all_by_user(ctx.caller(), user_id)
                .await?;
            let objects: Vec<KeyPair> = rows.into_iter().map(KeyPair::from_row).collect();
            event!(Level::DEBUG, count = objects.len(), "key pairs listed");
            Ok(Self { objects })
        }
        .instrument(span)
        .await
    }

    /// Counts live key pairs owned by `user_id`.
    ///
    /// This is a separate store call from [`get_by_user`](Self::get_by_user);
    /// a concurrent create or destroy between the two can make them disagree.
    pub async fn get_count_by_user(ctx: &RequestContext, user_id: &str) -> Result<u64> {
        let span =
            info_span!("keypair_list.get_count_by_user", mode = %ctx.mode(), user_id = %user_id);
        ctx.store()
            .key_pair_count_by_user(ctx.caller(), user_id)
            .instrument(span)
            .await
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&KeyPair> {
        self.objects.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeyPair> {
        self.objects.iter()
    }

    pub fn as_slice(&self) -> &[KeyPair] {
        &self.objects
    }

    pub fn into_vec(self) -> Vec<KeyPair> {
        self.objects
    }
}

impl Index<usize> for KeyPairList {
    type Output = KeyPair;

    fn index(&self, index: usize) -> &KeyPair {
        &self.objects[index]
    }
}

impl IntoIterator for KeyPairList {
    type Item = KeyPair;
    type IntoIter = std::vec::IntoIter<KeyPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.into_iter()
    }
}

impl<'a> IntoIterator for &'a KeyPairList {
    type Item = &'a KeyPair;
    type IntoIter = std::slice::Iter<'a, KeyPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.iter()
    }
}
