//! Translucent stage

use std::cmp::Ordering;

use crate::backend::*;
use crate::error::RenderResult;
use crate::scene::Instance;

use super::control::stages;
use super::DeferredControl;

impl<B: GraphicsBackend> DeferredControl<'_, B> {
    /// Blend translucent instances over the output, farthest first.
    ///
    /// Depth is tested against the opaque result but not written.
    pub fn render_translucent(&mut self) -> RenderResult<()> {
        self.ctx.marker(stages::TRANSLUCENT);
        let visible = self.visible;
        let observer = self.observer;
        let mut instances: Vec<&Instance> = visible.translucent.iter().collect();
        sort_back_to_front(&mut instances, |instance| observer.view_depth(instance.position()));

        let state = DrawState::fullscreen()
            .with_blend(BlendState::alpha_blending())
            .with_depth(DepthState::test_only());
        self.draw_instances(self.output.framebuffer, self.output.area(), &instances, state)
    }
}

/// Stable sort, deepest first
fn sort_back_to_front<T>(items: &mut [T], depth: impl Fn(&T) -> f32) {
    items.sort_by(|a, b| {
        depth(b)
            .partial_cmp(&depth(a))
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_back_to_front_keeps_ties_in_order() {
        let mut items = vec![(1.0, 'a'), (5.0, 'b'), (1.0, 'c'), (3.0, 'd')];
        sort_back_to_front(&mut items, |item| item.0);
        let order: String = items.iter().map(|item| item.1).collect();
        assert_eq!(order, "bdac");
    }
}
