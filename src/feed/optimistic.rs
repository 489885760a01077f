//! Optimistic engagement updates as value-level transactions.
//!
//! [`OptimisticUpdate::begin`] captures the target post's engagement,
//! applies the patch and returns the pre/post images. If the remote call
//! fails, [`OptimisticUpdate::revert`] applies the inverse to whatever the
//! collection holds at that point.

use crate::models::Post;

/// The part of a post an engagement mutation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Engagement {
    pub likes_count: u32,
    pub is_liked: bool,
}

impl Engagement {
    pub fn of(post: &Post) -> Self {
        Self {
            likes_count: post.likes_count,
            is_liked: post.is_liked,
        }
    }

    fn write_to(self, post: &mut Post) {
        post.likes_count = self.likes_count;
        post.is_liked = self.is_liked;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementPatch {
    Like,
    Unlike,
    /// Counts as a like, but only on competition entries.
    Vote,
}

impl EngagementPatch {
    pub fn applies_to(&self, post: &Post) -> bool {
        match self {
            EngagementPatch::Vote => post.is_competition_entry(),
            EngagementPatch::Like | EngagementPatch::Unlike => true,
        }
    }

    pub fn apply(&self, before: Engagement) -> Engagement {
        match self {
            EngagementPatch::Like | EngagementPatch::Vote => Engagement {
                likes_count: before.likes_count.saturating_add(1),
                is_liked: true,
            },
            EngagementPatch::Unlike => Engagement {
                likes_count: before.likes_count.saturating_sub(1),
                is_liked: false,
            },
        }
    }
}

/// A patch that has been applied locally and may need undoing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimisticUpdate {
    pub post_id: String,
    pub before: Engagement,
    pub after: Engagement,
}

impl OptimisticUpdate {
    /// Apply `patch` to every post with `post_id`. Overlapping pages can
    /// hold the same post twice, and all copies are kept in step. `None`
    /// when no post matches or the patch applies to none of them.
    ///
    /// `before` and `after` are the images of the first patched copy.
    pub fn begin(posts: &mut [Post], post_id: &str, patch: EngagementPatch) -> Option<Self> {
        let mut images = None;
        for post in posts
            .iter_mut()
            .filter(|p| p.id == post_id && patch.applies_to(p))
        {
            let before = Engagement::of(post);
            let after = patch.apply(before);
            after.write_to(post);
            images.get_or_insert((before, after));
        }
        let (before, after) = images?;
        Some(Self {
            post_id: post_id.to_string(),
            before,
            after,
        })
    }

    /// Undo the patch on every copy of the post. The like flag returns to
    /// its pre-image and the count moves back by the patch's delta, never
    /// below zero. Returns false when the post is no longer present.
    pub fn revert(&self, posts: &mut [Post]) -> bool {
        let delta = i64::from(self.after.likes_count) - i64::from(self.before.likes_count);
        let mut reverted = false;
        for post in posts.iter_mut().filter(|p| p.id == self.post_id) {
            let restored = (i64::from(post.likes_count) - delta).clamp(0, i64::from(u32::MAX));
            Engagement {
                likes_count: restored as u32,
                is_liked: self.before.is_liked,
            }
            .write_to(post);
            reverted = true;
        }
        reverted
    }
}
