use crate::flux::{Binder, BoundView, StoreHandle, View};
use crate::render::{Element, MountPoint};

use super::store::DemoStore;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemsProps {
    pub items: Vec<i64>,
}

/// An "Add" button above the list of items.
#[derive(Debug, Default)]
pub struct ItemsView {
    props: ItemsProps,
}

impl ItemsView {
    pub fn items(&self) -> &[i64] {
        &self.props.items
    }
}

impl View for ItemsView {
    type Props = ItemsProps;

    fn receive_props(&mut self, props: ItemsProps) {
        self.props = props;
    }

    fn render(&self) -> Element {
        Element::new("div")
            .child(
                Element::new("button")
                    .attr("class", "primary")
                    .text("Add"),
            )
            .child(
                Element::new("ul").with_children(
                    self.props
                        .items
                        .iter()
                        .map(|item| Element::new("li").text(item.to_string())),
                ),
            )
    }
}

/// Bind a fresh [`ItemsView`] to the demo store.
pub fn items_view_for(
    binder: &Binder,
    store: &StoreHandle<DemoStore>,
    mount: impl Into<MountPoint>,
) -> BoundView<ItemsView> {
    let source = store.clone();
    binder.bind(ItemsView::default(), mount, &[store], move || ItemsProps {
        items: source.get_state(),
    })
}

/// Hand-built nested tree:
///
/// ```text
/// div#parent
/// ├── div#child1 (h1, h2)
/// └── div#child2 (h1, h2)
/// ```
pub fn nested_tree() -> Element {
    let child = |id: &str| {
        Element::new("div")
            .attr("id", id)
            .child(Element::new("h1").text("I am h1 tag"))
            .child(Element::new("h2").text("I am h2 tag"))
    };

    Element::new("div")
        .attr("id", "parent")
        .child(child("child1"))
        .child(child("child2"))
}
