mod model_loaders;

pub use model_loaders::{
    load_card_middleware, load_checklist_item_middleware, load_checklist_middleware,
    load_list_middleware, load_project_middleware,
};
