//! # Undo
//!
//! Two stacks of [`Undoer`]s: what has been done, and what has been undone. Undoing pops a record and reverts
//! it, and the revert itself pushes the record that would redo it onto the other stack. Redo is the same thing
//! in the opposite direction - there is no separate redo code path.
//!
//! [`Undoer::OpenGroup`] and [`Undoer::CloseGroup`] bracket records that must be stepped as one.

mod undoer;

pub use undoer::{Undoer, UndoerKind, UndoersCollector};

use crate::{
    dirty::DirtyError,
    objects::{LookupError, ObjectsContainer},
    state::{LayerError, Sprite, SpriteError},
    stock::StockError,
};

#[derive(thiserror::Error, Debug)]
pub enum UndoError {
    #[error("close-group marker without a matching open-group")]
    UnbalancedGroup,
    #[error("can't step through history while a group is still open")]
    GroupOpen,
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Stock(#[from] StockError),
    #[error(transparent)]
    Layer(#[from] LayerError),
    #[error(transparent)]
    Sprite(#[from] SpriteError),
    #[error(transparent)]
    Dirty(#[from] DirtyError),
}

/// User-facing history settings.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct UndoConfig {
    /// Whether changes are recorded at all.
    pub enabled: bool,
    /// Approximate upper bound on memory held by undo records, in bytes. Oldest steps are dropped first.
    /// The most recent step is always kept, however large.
    pub size_limit: Option<usize>,
}
impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            size_limit: Some(64 * 1024 * 1024),
        }
    }
}

/// A stack of undoers that keeps a running tally of their memory.
#[derive(Default, Debug)]
pub struct UndoersStack {
    // Front is oldest.
    undoers: std::collections::VecDeque<Undoer>,
    memory: usize,
}
impl UndoersStack {
    fn pop(&mut self) -> Option<Undoer> {
        let undoer = self.undoers.pop_back()?;
        self.memory -= undoer.memory_size();
        Some(undoer)
    }
    fn pop_front(&mut self) -> Option<Undoer> {
        let undoer = self.undoers.pop_front()?;
        self.memory -= undoer.memory_size();
        Some(undoer)
    }
    fn clear(&mut self) {
        self.undoers.clear();
        self.memory = 0;
    }
    /// Drop the oldest complete step. Returns false if that would leave nothing.
    fn drop_oldest_step(&mut self) -> bool {
        let mut depth = 0usize;
        let mut len = 0;
        for undoer in &self.undoers {
            len += 1;
            match undoer {
                Undoer::OpenGroup => depth += 1,
                Undoer::CloseGroup => depth = depth.saturating_sub(1),
                _ => (),
            }
            if depth == 0 {
                break;
            }
        }
        if len >= self.undoers.len() {
            return false;
        }
        for _ in 0..len {
            self.pop_front();
        }
        true
    }
    /// Number of user-visible steps, counting each top-level group once.
    #[must_use]
    pub fn steps(&self) -> usize {
        let mut depth = 0usize;
        let mut steps = 0;
        for undoer in &self.undoers {
            match undoer {
                Undoer::OpenGroup => {
                    if depth == 0 {
                        steps += 1;
                    }
                    depth += 1;
                }
                Undoer::CloseGroup => depth = depth.saturating_sub(1),
                _ if depth == 0 => steps += 1,
                _ => (),
            }
        }
        steps
    }
    fn top_kind(&self) -> Option<UndoerKind> {
        self.undoers
            .iter()
            .rev()
            .find(|undoer| !matches!(undoer, Undoer::OpenGroup | Undoer::CloseGroup))
            .map(Undoer::kind)
    }
    /// Number of records, counting group markers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.undoers.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.undoers.is_empty()
    }
    #[must_use]
    pub fn memory_size(&self) -> usize {
        self.memory
    }
    /// Oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Undoer> + '_ {
        self.undoers.iter()
    }
}
impl UndoersCollector for UndoersStack {
    fn push_undoer(&mut self, undoer: Undoer) {
        self.memory += undoer.memory_size();
        self.undoers.push_back(undoer);
    }
}

#[derive(Debug)]
pub struct UndoHistory {
    objects: ObjectsContainer,
    undoers: UndoersStack,
    redoers: UndoersStack,
    enabled: bool,
    /// Open groups on the undo side.
    group_depth: usize,
    size_limit: Option<usize>,
}
impl Default for UndoHistory {
    fn default() -> Self {
        Self::with_config(&UndoConfig::default())
    }
}
impl UndoHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn with_config(config: &UndoConfig) -> Self {
        Self {
            objects: ObjectsContainer::new(),
            undoers: UndoersStack::default(),
            redoers: UndoersStack::default(),
            enabled: config.enabled,
            group_depth: 0,
            size_limit: config.size_limit,
        }
    }
    /// The registry undoers should be built against.
    pub fn objects(&mut self) -> &mut ObjectsContainer {
        &mut self.objects
    }
    /// Whether pushed undoers are recorded. Check this before doing expensive work to build one.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
    /// Refused while a group is open, as its close-group would go unrecorded.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), UndoError> {
        if self.is_group_open() {
            return Err(UndoError::GroupOpen);
        }
        self.enabled = enabled;
        Ok(())
    }
    pub fn set_size_limit(&mut self, limit: Option<usize>) {
        self.size_limit = limit;
        self.trim();
    }
    /// Record a change that has just been made (or is about to be). Discards anything that could be redone.
    ///
    /// No-op while disabled.
    pub fn push_undoer(&mut self, undoer: Undoer) -> Result<(), UndoError> {
        if !self.enabled {
            return Ok(());
        }
        match undoer {
            Undoer::OpenGroup => self.group_depth += 1,
            Undoer::CloseGroup => {
                self.group_depth = self
                    .group_depth
                    .checked_sub(1)
                    .ok_or(UndoError::UnbalancedGroup)?;
            }
            _ => (),
        }
        log::trace!("Recording {:?}", undoer.kind());
        self.undoers.push_undoer(undoer);
        if !self.redoers.is_empty() {
            log::trace!("Discarding {} redo steps", self.redoers.steps());
            self.redoers.clear();
        }
        if self.group_depth == 0 {
            self.trim();
        }
        Ok(())
    }
    /// Whether an open-group has been pushed without its close-group yet.
    #[must_use]
    pub fn is_group_open(&self) -> bool {
        self.group_depth != 0
    }
    /// Throw away every record pushed since the outermost open-group, including it. For when the change being
    /// recorded was abandoned partway.
    pub fn discard_open_group(&mut self) {
        if !self.is_group_open() {
            return;
        }
        let mut dropped = 0usize;
        while self.group_depth != 0 {
            let Some(undoer) = self.undoers.pop() else {
                self.group_depth = 0;
                break;
            };
            match undoer {
                Undoer::OpenGroup => self.group_depth -= 1,
                Undoer::CloseGroup => self.group_depth += 1,
                _ => (),
            }
            dropped += 1;
        }
        log::debug!("Discarded {dropped} records of an abandoned group");
    }
    fn trim(&mut self) {
        let Some(limit) = self.size_limit else {
            return;
        };
        while self.undoers.memory_size() > limit {
            if !self.undoers.drop_oldest_step() {
                break;
            }
            log::debug!(
                "Dropped oldest undo step, {} bytes remain",
                self.undoers.memory_size()
            );
        }
    }
    /// Revert the most recent step. Returns false if there was nothing to undo.
    pub fn undo(&mut self, sprite: &mut Sprite) -> Result<bool, UndoError> {
        if self.is_group_open() {
            return Err(UndoError::GroupOpen);
        }
        step(&mut self.objects, &mut self.undoers, &mut self.redoers, sprite)
    }
    /// Re-apply the most recently undone step. Returns false if there was nothing to redo.
    pub fn redo(&mut self, sprite: &mut Sprite) -> Result<bool, UndoError> {
        if self.is_group_open() {
            return Err(UndoError::GroupOpen);
        }
        step(&mut self.objects, &mut self.redoers, &mut self.undoers, sprite)
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undoers.is_empty()
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redoers.is_empty()
    }
    /// Number of steps [`Self::undo`] could take.
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undoers.steps()
    }
    /// Number of steps [`Self::redo`] could take.
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redoers.steps()
    }
    /// What the next undo would revert, for labeling. Groups are named by their most recent member.
    #[must_use]
    pub fn next_undo_kind(&self) -> Option<UndoerKind> {
        self.undoers.top_kind()
    }
    #[must_use]
    pub fn next_redo_kind(&self) -> Option<UndoerKind> {
        self.redoers.top_kind()
    }
    #[must_use]
    pub fn undoers(&self) -> &UndoersStack {
        &self.undoers
    }
    #[must_use]
    pub fn redoers(&self) -> &UndoersStack {
        &self.redoers
    }
    /// Memory held by both stacks.
    #[must_use]
    pub fn memory_size(&self) -> usize {
        self.undoers.memory_size() + self.redoers.memory_size()
    }
}

/// Pop one step from `from` and revert it, collecting the inverse into `to`.
///
/// All or nothing: if any record of the step fails to revert, the records already reverted are re-applied and
/// the whole step goes back onto `from`.
fn step(
    objects: &mut ObjectsContainer,
    from: &mut UndoersStack,
    to: &mut UndoersStack,
    sprite: &mut Sprite,
) -> Result<bool, UndoError> {
    // Newest first. Walking backwards, so close-groups open and open-groups close.
    let mut records = Vec::new();
    let mut depth = 0usize;
    loop {
        let Some(undoer) = from.pop() else {
            if records.is_empty() {
                return Ok(false);
            }
            restack(from, records);
            return Err(UndoError::UnbalancedGroup);
        };
        match undoer {
            Undoer::CloseGroup => depth += 1,
            Undoer::OpenGroup if depth == 0 => {
                records.push(undoer);
                restack(from, records);
                return Err(UndoError::UnbalancedGroup);
            }
            Undoer::OpenGroup => depth -= 1,
            _ => (),
        }
        records.push(undoer);
        if depth == 0 {
            break;
        }
    }

    let mut inverses: Vec<Undoer> = Vec::with_capacity(records.len());
    let mut pending = records.into_iter();
    while let Some(undoer) = pending.next() {
        let Err((err, failed)) = undoer.revert(objects, sprite, &mut inverses) else {
            continue;
        };
        log::warn!(
            "Reverting {:?} failed, putting the step back: {err}",
            failed.kind()
        );
        // Reverting an inverse rebuilds the record it came from.
        let mut rebuilt: Vec<Undoer> = Vec::with_capacity(inverses.len());
        for inverse in inverses.into_iter().rev() {
            if let Err((unwind, lost)) = inverse.revert(objects, sprite, &mut rebuilt) {
                log::error!("Couldn't re-apply {:?}: {unwind}", lost.kind());
            }
        }
        let untouched: Vec<Undoer> = pending.by_ref().collect();
        restack(from, untouched);
        from.push_undoer(failed);
        for undoer in rebuilt {
            from.push_undoer(undoer);
        }
        return Err(err);
    }
    for inverse in inverses {
        to.push_undoer(inverse);
    }
    Ok(true)
}

/// Push newest-first `records` back onto `stack`.
fn restack(stack: &mut UndoersStack, records: Vec<Undoer>) {
    for undoer in records.into_iter().rev() {
        stack.push_undoer(undoer);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{image::PixelFormat, state::Sprite};

    fn sprite_with_layers() -> (Sprite, [crate::state::LayerID; 3]) {
        let mut sprite = Sprite::new(PixelFormat::Rgb, 4, 4);
        let layers = [
            sprite.add_layer("a"),
            sprite.add_layer("b"),
            sprite.add_layer("c"),
        ];
        (sprite, layers)
    }
    fn select(history: &mut UndoHistory, sprite: &mut Sprite, layer: crate::state::LayerID) {
        let undoer = Undoer::set_current_layer(history.objects(), sprite);
        history.push_undoer(undoer).unwrap();
        sprite.set_current_layer(Some(layer)).unwrap();
    }

    #[test]
    fn undo_redo_single() {
        let (mut sprite, [a, b, _]) = sprite_with_layers();
        let mut history = UndoHistory::new();
        select(&mut history, &mut sprite, b);

        assert!(history.undo(&mut sprite).unwrap());
        assert_eq!(sprite.current_layer(), Some(a));
        assert!(history.can_redo());
        assert!(history.redo(&mut sprite).unwrap());
        assert_eq!(sprite.current_layer(), Some(b));
        assert!(!history.can_redo());
    }
    #[test]
    fn empty_history_is_noop() {
        let (mut sprite, _) = sprite_with_layers();
        let mut history = UndoHistory::new();
        assert!(!history.undo(&mut sprite).unwrap());
        assert!(!history.redo(&mut sprite).unwrap());
    }
    #[test]
    fn n_undos_then_n_redos() {
        let (mut sprite, [a, b, c]) = sprite_with_layers();
        let mut history = UndoHistory::new();
        for layer in [b, c, a, c] {
            select(&mut history, &mut sprite, layer);
        }
        for _ in 0..4 {
            assert!(history.undo(&mut sprite).unwrap());
        }
        assert_eq!(sprite.current_layer(), Some(a));
        assert!(!history.undo(&mut sprite).unwrap());
        for _ in 0..4 {
            assert!(history.redo(&mut sprite).unwrap());
        }
        assert_eq!(sprite.current_layer(), Some(c));
    }
    #[test]
    fn groups_are_atomic() {
        let (mut sprite, [a, b, c]) = sprite_with_layers();
        let mut history = UndoHistory::new();
        history.push_undoer(Undoer::OpenGroup).unwrap();
        select(&mut history, &mut sprite, b);
        select(&mut history, &mut sprite, c);
        let undoer = Undoer::set_current_frame(history.objects(), &sprite);
        history.push_undoer(undoer).unwrap();
        sprite.set_frames(2);
        sprite.set_current_frame(1).unwrap();
        history.push_undoer(Undoer::CloseGroup).unwrap();
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.next_undo_kind(), Some(UndoerKind::SetCurrentFrame));
        assert_eq!(
            history.next_undo_kind().map(|kind| kind.as_ref().to_owned()),
            Some("SetCurrentFrame".to_owned())
        );

        assert!(history.undo(&mut sprite).unwrap());
        assert_eq!(sprite.current_layer(), Some(a));
        assert_eq!(sprite.current_frame(), 0);
        assert_eq!(history.redo_len(), 1);
        assert!(!history.can_undo());
        assert_eq!(history.redoers().steps(), 1);

        assert!(history.redo(&mut sprite).unwrap());
        assert_eq!(sprite.current_layer(), Some(c));
        assert_eq!(sprite.current_frame(), 1);
        assert_eq!(history.undoers().steps(), 1);
    }
    #[test]
    fn nested_groups() {
        let (mut sprite, [a, b, c]) = sprite_with_layers();
        let mut history = UndoHistory::new();
        history.push_undoer(Undoer::OpenGroup).unwrap();
        select(&mut history, &mut sprite, b);
        history.push_undoer(Undoer::OpenGroup).unwrap();
        select(&mut history, &mut sprite, c);
        history.push_undoer(Undoer::CloseGroup).unwrap();
        history.push_undoer(Undoer::CloseGroup).unwrap();
        assert_eq!(history.undoers().steps(), 1);
        assert!(history.undo(&mut sprite).unwrap());
        assert_eq!(sprite.current_layer(), Some(a));
    }
    #[test]
    fn unbalanced_close() {
        let mut history = UndoHistory::new();
        assert!(matches!(
            history.push_undoer(Undoer::CloseGroup),
            Err(UndoError::UnbalancedGroup)
        ));
    }
    #[test]
    fn stepping_with_open_group() {
        let (mut sprite, _) = sprite_with_layers();
        let mut history = UndoHistory::new();
        history.push_undoer(Undoer::OpenGroup).unwrap();
        assert!(matches!(
            history.undo(&mut sprite),
            Err(UndoError::GroupOpen)
        ));
    }
    #[test]
    fn new_edit_discards_redo() {
        let (mut sprite, [_, b, c]) = sprite_with_layers();
        let mut history = UndoHistory::new();
        select(&mut history, &mut sprite, b);
        history.undo(&mut sprite).unwrap();
        assert!(history.can_redo());
        select(&mut history, &mut sprite, c);
        assert!(!history.can_redo());
    }
    #[test]
    fn disabled_records_nothing() {
        let (mut sprite, [_, b, _]) = sprite_with_layers();
        let mut history = UndoHistory::new();
        history.set_enabled(false).unwrap();
        select(&mut history, &mut sprite, b);
        assert!(!history.can_undo());
        assert!(!history.undo(&mut sprite).unwrap());
        assert_eq!(sprite.current_layer(), Some(b));
    }
    #[test]
    fn toggling_refused_inside_group() {
        let (mut sprite, [_, b, _]) = sprite_with_layers();
        let mut history = UndoHistory::new();
        history.push_undoer(Undoer::OpenGroup).unwrap();
        select(&mut history, &mut sprite, b);
        assert!(matches!(
            history.set_enabled(false),
            Err(UndoError::GroupOpen)
        ));
        assert!(history.is_enabled());
        history.push_undoer(Undoer::CloseGroup).unwrap();
        history.set_enabled(false).unwrap();
        assert!(history.undo(&mut sprite).unwrap());
    }
    #[test]
    fn discarding_open_group() {
        let (mut sprite, [a, b, c]) = sprite_with_layers();
        let mut history = UndoHistory::new();
        select(&mut history, &mut sprite, b);
        history.push_undoer(Undoer::OpenGroup).unwrap();
        select(&mut history, &mut sprite, c);
        history.push_undoer(Undoer::OpenGroup).unwrap();
        history.push_undoer(Undoer::CloseGroup).unwrap();
        // The change is abandoned and put back by hand.
        sprite.set_current_layer(Some(b)).unwrap();
        history.discard_open_group();

        assert!(!history.is_group_open());
        assert_eq!(history.undoers().len(), 1);
        assert!(history.undo(&mut sprite).unwrap());
        assert_eq!(sprite.current_layer(), Some(a));
        assert!(history.redo(&mut sprite).unwrap());
        assert_eq!(sprite.current_layer(), Some(b));
    }
    #[test]
    fn failed_step_goes_back() {
        let (mut sprite, [_, b, c]) = sprite_with_layers();
        let mut history = UndoHistory::new();
        history.push_undoer(Undoer::OpenGroup).unwrap();
        select(&mut history, &mut sprite, b);
        // Recorded against a sprite the history has never seen, so it can't be reverted.
        let stranger = Sprite::new(PixelFormat::Rgb, 1, 1);
        let undoer = Undoer::set_current_frame(history.objects(), &stranger);
        history.push_undoer(undoer).unwrap();
        select(&mut history, &mut sprite, c);
        history.push_undoer(Undoer::CloseGroup).unwrap();
        let recorded: Vec<_> = history.undoers().iter().map(Undoer::kind).collect();
        let memory = history.memory_size();

        assert!(matches!(
            history.undo(&mut sprite),
            Err(UndoError::Lookup(LookupError::Dangling(_)))
        ));
        // The layer change after the bad record was re-applied.
        assert_eq!(sprite.current_layer(), Some(c));
        let kinds: Vec<_> = history.undoers().iter().map(Undoer::kind).collect();
        assert_eq!(kinds, recorded);
        assert!(history.redoers().is_empty());
        assert_eq!(history.memory_size(), memory);
    }
    #[test]
    fn size_limit_drops_oldest_steps() {
        let (mut sprite, [a, b, c]) = sprite_with_layers();
        let one_step = Undoer::OpenGroup.memory_size();
        let mut history = UndoHistory::with_config(&UndoConfig {
            enabled: true,
            size_limit: Some(one_step * 2),
        });
        for layer in [b, c, a] {
            select(&mut history, &mut sprite, layer);
        }
        assert_eq!(history.undoers().steps(), 2);
        history.undo(&mut sprite).unwrap();
        history.undo(&mut sprite).unwrap();
        assert_eq!(sprite.current_layer(), Some(b));
        assert!(!history.undo(&mut sprite).unwrap());

        // The newest step survives even when it alone is over the limit.
        history.set_size_limit(Some(0));
        assert_eq!(history.undoers().steps(), 0);
        select(&mut history, &mut sprite, c);
        assert_eq!(history.undoers().steps(), 1);
    }
}
