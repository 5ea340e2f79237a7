use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use winit::event::{ElementState, KeyboardInput, VirtualKeyCode};

/// 키 입력이 bool 슬롯을 어떻게 바꿀지 정함
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// 누를 때마다 값을 뒤집음
    Switch,
    /// 누르고 있는 동안만 true
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Repeat,
    Release,
}

/// 바인딩이 가리키는 슬롯(핸들)을 실제 bool로 풀어주는 소유자
pub trait FlagSlots<S> {
    fn slot_mut(&mut self, slot: S) -> &mut bool;
}

/// 키 → (슬롯 핸들, 정책) 테이블.
///
/// 슬롯은 포인터가 아니라 핸들이라서, 테이블은 값을 직접 들고 있지 않고
/// `dispatch` 때 넘겨받은 소유자를 통해서만 값을 바꿈.
#[derive(Debug)]
pub struct InputMap<K, S> {
    bindings: HashMap<K, (S, Policy)>,
}

impl<K: Eq + Hash, S: Copy> Default for InputMap<K, S> {
    fn default() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, S: Copy> InputMap<K, S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 같은 키를 다시 등록하면 마지막 등록이 이김
    pub fn bind(&mut self, key: K, slot: S, policy: Policy) {
        self.bindings.insert(key, (slot, policy));
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// 등록된 키면 true
    pub fn dispatch<T: FlagSlots<S> + ?Sized>(&self, key: &K, action: KeyAction, owner: &mut T) -> bool {
        let Some(&(slot, policy)) = self.bindings.get(key) else {
            return false;
        };

        let value = owner.slot_mut(slot);
        match policy {
            Policy::Switch => {
                if action == KeyAction::Press {
                    *value = !*value;
                }
            }
            Policy::Hold => *value = action != KeyAction::Release,
        }

        true
    }
}

/// winit 0.28은 키 반복을 따로 알려주지 않으므로, 이미 눌린 키의 Pressed를 Repeat로 바꿈
#[derive(Debug, Default)]
pub struct KeyTracker {
    held: HashSet<VirtualKeyCode>,
}

impl KeyTracker {
    pub fn track(&mut self, input: &KeyboardInput) -> Option<(VirtualKeyCode, KeyAction)> {
        let key = input.virtual_keycode?;
        let action = match input.state {
            ElementState::Pressed if !self.held.insert(key) => KeyAction::Repeat,
            ElementState::Pressed => KeyAction::Press,
            ElementState::Released => {
                self.held.remove(&key);
                KeyAction::Release
            }
        };

        Some((key, action))
    }

    /// 창이 포커스를 잃으면 Released가 안 올 수 있음
    pub fn release_all(&mut self) -> Vec<VirtualKeyCode> {
        self.held.drain().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Flags([bool; 2]);

    impl FlagSlots<usize> for Flags {
        fn slot_mut(&mut self, slot: usize) -> &mut bool {
            &mut self.0[slot]
        }
    }

    #[test]
    fn switch_flips_only_on_press() {
        let mut map = InputMap::new();
        map.bind('p', 0, Policy::Switch);
        let mut flags = Flags::default();

        map.dispatch(&'p', KeyAction::Press, &mut flags);
        assert!(flags.0[0]);
        map.dispatch(&'p', KeyAction::Repeat, &mut flags);
        map.dispatch(&'p', KeyAction::Repeat, &mut flags);
        assert!(flags.0[0]);
        map.dispatch(&'p', KeyAction::Release, &mut flags);
        assert!(flags.0[0]);
        map.dispatch(&'p', KeyAction::Press, &mut flags);
        assert!(!flags.0[0]);
    }

    #[test]
    fn hold_follows_last_event() {
        let mut map = InputMap::new();
        map.bind('w', 1, Policy::Hold);
        let mut flags = Flags::default();

        for action in [
            KeyAction::Press,
            KeyAction::Repeat,
            KeyAction::Release,
            KeyAction::Repeat,
            KeyAction::Release,
            KeyAction::Press,
        ] {
            map.dispatch(&'w', action, &mut flags);
            assert_eq!(flags.0[1], action != KeyAction::Release);
        }
    }

    #[test]
    fn unbound_key_is_ignored() {
        let map: InputMap<char, usize> = InputMap::new();
        let mut flags = Flags::default();

        assert!(!map.dispatch(&'q', KeyAction::Press, &mut flags));
        assert_eq!(flags.0, [false, false]);
    }

    #[test]
    fn last_registration_wins() {
        let mut map = InputMap::new();
        map.bind('x', 0, Policy::Hold);
        map.bind('x', 1, Policy::Switch);
        let mut flags = Flags::default();

        map.dispatch(&'x', KeyAction::Press, &mut flags);
        map.dispatch(&'x', KeyAction::Release, &mut flags);
        assert_eq!(map.len(), 1);
        assert_eq!(flags.0, [false, true]);
    }

    #[allow(deprecated)]
    fn key_event(key: VirtualKeyCode, state: ElementState) -> KeyboardInput {
        KeyboardInput {
            scancode: 0,
            state,
            virtual_keycode: Some(key),
            modifiers: Default::default(),
        }
    }

    #[test]
    fn tracker_reports_repeats() {
        let mut tracker = KeyTracker::default();

        let press = key_event(VirtualKeyCode::W, ElementState::Pressed);
        let release = key_event(VirtualKeyCode::W, ElementState::Released);

        assert_eq!(tracker.track(&press), Some((VirtualKeyCode::W, KeyAction::Press)));
        assert_eq!(tracker.track(&press), Some((VirtualKeyCode::W, KeyAction::Repeat)));
        assert_eq!(tracker.track(&release), Some((VirtualKeyCode::W, KeyAction::Release)));
        assert_eq!(tracker.track(&press), Some((VirtualKeyCode::W, KeyAction::Press)));
    }
}
