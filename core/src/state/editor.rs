//! Pure editing-mode state machine.
//!
//! The interactive editor feeds pointer and key events in and executes the
//! returned side effects against its scene; no drawing or socket work
//! happens here, which keeps every mode change unit-testable. Drag-vs-pick
//! disambiguation and split-parameter stepping follow the modal tool this
//! replaces: a press is a pick until the pointer moves, and the split
//! parameter walks in 0.1 steps clamped to the curve's segment count.

use crate::mesh::BarycentricPoint;

/// Where a pointer event landed on the edited object, already converted to
/// surface coordinates by the caller's ray cast. Events that missed the
/// object carry `None` and leave the state alone.
pub type SurfaceHit = BarycentricPoint;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditState {
    /// Waiting for input, nothing held.
    Idle,
    /// Primary button held on `point`, not yet moved. Release picks; motion
    /// promotes to `Dragging`.
    Picking { point: usize },
    /// Control point `point` follows the pointer until release.
    Dragging { point: usize },
    /// Choosing a curve parameter to split at.
    SplitMode { t: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditEvent {
    PrimaryPress { point: usize },
    PrimaryRelease { hit: Option<SurfaceHit> },
    PointerMove { hit: Option<SurfaceHit> },
    /// Secondary button released on the surface: append a segment there.
    SecondaryRelease { hit: Option<SurfaceHit> },
    ToggleSplitMode,
    StepSplitParameter { up: bool },
    ToggleSmooth,
    CloseCurve,
    Quit,
}

/// Work the caller must perform after a transition, in order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SideEffect {
    /// Select the control point nearest to the hit.
    PickPoint(SurfaceHit),
    /// Move the selected control point (and, on smooth curves, re-solve the
    /// opposite tangent of the affected anchor).
    MovePoint { point: usize, to: SurfaceHit },
    /// Extend the curve with a new segment ending at the hit.
    AppendSegment(SurfaceHit),
    /// Split the curve at parameter `t` and splice the result in.
    SplitCurve { t: f64 },
    /// Redraw the split-parameter marker at `t`.
    DrawSplitMarker { t: f64 },
    SetSmooth(bool),
    /// Record an undo step; emitted after every committed edit.
    CommitUndo,
    ExitEditor,
}

/// Advance the machine by one event.
///
/// `segments` is the current segment count of the edited curve (upper bound
/// for the split parameter) and `smooth` the curve's current tangent mode.
pub fn transition(
    state: EditState,
    event: EditEvent,
    segments: usize,
    smooth: bool,
) -> (EditState, Vec<SideEffect>) {
    use EditEvent as E;
    use EditState as S;
    use SideEffect as Fx;

    match (state, event) {
        (_, E::Quit) => (S::Idle, vec![Fx::ExitEditor]),

        // Split mode swallows everything except its own controls.
        (S::SplitMode { t }, E::StepSplitParameter { up }) => {
            let stepped = if up { t + 0.1 } else { t - 0.1 };
            // One decimal, clamped to [0, segment count].
            let t = (stepped * 10.0).round() / 10.0;
            let t = t.clamp(0.0, segments as f64);
            (S::SplitMode { t }, vec![Fx::DrawSplitMarker { t }])
        }
        (S::SplitMode { t }, E::PrimaryRelease { .. }) => (
            S::Idle,
            vec![Fx::SplitCurve { t }, Fx::CommitUndo],
        ),
        (S::SplitMode { .. }, E::ToggleSplitMode) => (S::Idle, vec![]),
        (s @ S::SplitMode { .. }, _) => (s, vec![]),

        (S::Idle, E::ToggleSplitMode) => {
            let t = 0.1f64.min(segments as f64);
            (S::SplitMode { t }, vec![Fx::DrawSplitMarker { t }])
        }

        (S::Idle, E::PrimaryPress { point }) => (S::Picking { point }, vec![]),

        // Release without motion is a pick; a miss just drops the press.
        (S::Picking { .. }, E::PrimaryRelease { hit }) => match hit {
            Some(hit) => (S::Idle, vec![Fx::PickPoint(hit), Fx::CommitUndo]),
            None => (S::Idle, vec![]),
        },
        (S::Picking { point }, E::PointerMove { hit }) => {
            let fx = match hit {
                Some(to) => vec![Fx::MovePoint { point, to }],
                None => vec![],
            };
            (S::Dragging { point }, fx)
        }

        (S::Dragging { point }, E::PointerMove { hit: Some(to) }) => (
            S::Dragging { point },
            vec![Fx::MovePoint { point, to }],
        ),
        (s @ S::Dragging { .. }, E::PointerMove { hit: None }) => (s, vec![]),
        (S::Dragging { .. }, E::PrimaryRelease { .. }) => (S::Idle, vec![Fx::CommitUndo]),

        (S::Idle, E::SecondaryRelease { hit: Some(hit) }) => (
            S::Idle,
            vec![Fx::AppendSegment(hit), Fx::CommitUndo],
        ),

        (S::Idle, E::ToggleSmooth) => (S::Idle, vec![Fx::SetSmooth(!smooth)]),

        (S::Idle, E::CloseCurve) => (S::Idle, vec![Fx::CommitUndo]),

        (s, _) => (s, vec![]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(face: usize, u: f64, v: f64) -> SurfaceHit {
        BarycentricPoint::new(face, u, v)
    }

    #[test]
    fn test_press_release_is_pick() {
        let (s, _) = transition(EditState::Idle, EditEvent::PrimaryPress { point: 2 }, 2, true);
        assert_eq!(s, EditState::Picking { point: 2 });

        let h = hit(0, 0.3, 0.3);
        let (s, fx) = transition(s, EditEvent::PrimaryRelease { hit: Some(h) }, 2, true);
        assert_eq!(s, EditState::Idle);
        assert_eq!(fx, vec![SideEffect::PickPoint(h), SideEffect::CommitUndo]);
    }

    #[test]
    fn test_motion_promotes_to_drag() {
        let h = hit(0, 0.4, 0.1);
        let (s, fx) = transition(
            EditState::Picking { point: 5 },
            EditEvent::PointerMove { hit: Some(h) },
            2,
            true,
        );
        assert_eq!(s, EditState::Dragging { point: 5 });
        assert_eq!(fx, vec![SideEffect::MovePoint { point: 5, to: h }]);

        // Release after a drag commits but does not pick.
        let (s, fx) = transition(s, EditEvent::PrimaryRelease { hit: Some(h) }, 2, true);
        assert_eq!(s, EditState::Idle);
        assert_eq!(fx, vec![SideEffect::CommitUndo]);
    }

    #[test]
    fn test_drag_ignores_misses() {
        let s = EditState::Dragging { point: 1 };
        let (s2, fx) = transition(s, EditEvent::PointerMove { hit: None }, 2, true);
        assert_eq!(s2, s);
        assert!(fx.is_empty());
    }

    #[test]
    fn test_split_parameter_steps_and_clamps() {
        let (s, _) = transition(EditState::Idle, EditEvent::ToggleSplitMode, 2, true);
        assert_eq!(s, EditState::SplitMode { t: 0.1 });

        let mut s = s;
        for _ in 0..30 {
            let (next, _) = transition(s, EditEvent::StepSplitParameter { up: true }, 2, true);
            s = next;
        }
        assert_eq!(s, EditState::SplitMode { t: 2.0 });

        for _ in 0..30 {
            let (next, _) = transition(s, EditEvent::StepSplitParameter { up: false }, 2, true);
            s = next;
        }
        assert_eq!(s, EditState::SplitMode { t: 0.0 });
    }

    #[test]
    fn test_split_confirm_and_cancel() {
        let s = EditState::SplitMode { t: 1.3 };
        let (s2, fx) = transition(s, EditEvent::PrimaryRelease { hit: None }, 2, true);
        assert_eq!(s2, EditState::Idle);
        assert_eq!(
            fx,
            vec![SideEffect::SplitCurve { t: 1.3 }, SideEffect::CommitUndo]
        );

        let (s3, fx) = transition(s, EditEvent::ToggleSplitMode, 2, true);
        assert_eq!(s3, EditState::Idle);
        assert!(fx.is_empty());

        // Other editing events are swallowed while in split mode.
        let (s4, fx) = transition(s, EditEvent::ToggleSmooth, 2, true);
        assert_eq!(s4, s);
        assert!(fx.is_empty());
    }

    #[test]
    fn test_append_and_smooth_toggle() {
        let h = hit(1, 0.2, 0.2);
        let (_, fx) = transition(
            EditState::Idle,
            EditEvent::SecondaryRelease { hit: Some(h) },
            1,
            true,
        );
        assert_eq!(
            fx,
            vec![SideEffect::AppendSegment(h), SideEffect::CommitUndo]
        );

        let (_, fx) = transition(EditState::Idle, EditEvent::ToggleSmooth, 1, true);
        assert_eq!(fx, vec![SideEffect::SetSmooth(false)]);
    }

    #[test]
    fn test_quit_from_any_state() {
        for s in [
            EditState::Idle,
            EditState::Picking { point: 0 },
            EditState::Dragging { point: 0 },
            EditState::SplitMode { t: 0.5 },
        ] {
            let (s2, fx) = transition(s, EditEvent::Quit, 1, true);
            assert_eq!(s2, EditState::Idle);
            assert_eq!(fx, vec![SideEffect::ExitEditor]);
        }
    }
}
