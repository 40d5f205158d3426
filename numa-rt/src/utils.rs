/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright (c) 2020-2021, Clemens Lutz
 * Author: Clemens Lutz <lutzcle@cml.li>
 */

mod cache_padded;

pub use cache_padded::CachePadded;
